//! Timestamp selection and formatting.

use std::fs::Metadata;
use std::io::Write;
use std::os::unix::fs::MetadataExt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jiff::Zoned;
use jiff::fmt::StdIoWrite;
use jiff::fmt::strtime::{BrokenDownTime, Config};

/// Timestamp format used in long listings.
pub static LONG_FORMAT: &str = "%b %d %H:%M";

/// Which of the three stat timestamps an operation works with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeField {
    #[default]
    Modification,
    Access,
    Change,
}

/// The selected timestamp as raw `(seconds, nanoseconds)`, suitable as a
/// total-order sort key even for pre-epoch times.
pub fn metadata_time_key(md: &Metadata, field: TimeField) -> (i64, i64) {
    match field {
        TimeField::Modification => (md.mtime(), md.mtime_nsec()),
        TimeField::Access => (md.atime(), md.atime_nsec()),
        TimeField::Change => (md.ctime(), md.ctime_nsec()),
    }
}

/// The selected timestamp as a `SystemTime`, if representable.
pub fn metadata_system_time(md: &Metadata, field: TimeField) -> Option<SystemTime> {
    let (sec, nsec) = metadata_time_key(md, field);
    if sec >= 0 {
        UNIX_EPOCH.checked_add(Duration::new(sec as u64, nsec as u32))
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(sec.unsigned_abs()))
            .and_then(|t| t.checked_add(Duration::from_nanos(nsec as u64)))
    }
}

fn system_time_to_sec(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Format `time` according to `fmt` in the local time zone, appending to
/// `out`. Times a zoned datetime cannot represent fall back to the raw
/// seconds-since-epoch integer.
pub fn format_system_time<W: Write>(out: &mut W, time: SystemTime, fmt: &str) -> std::io::Result<()> {
    let zoned: Result<Zoned, _> = time.try_into();
    match zoned {
        Ok(zoned) => {
            let tm = BrokenDownTime::from(&zoned);
            let mut out = StdIoWrite(out);
            let config = Config::new().lenient(true);
            tm.format_with_config(&config, fmt, &mut out)
                .map_err(std::io::Error::other)
        }
        Err(_) => out.write_all(system_time_to_sec(time).to_string().as_bytes()),
    }
}
