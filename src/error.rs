//! Error values returned by the core listing operations, plus the sticky
//! process exit code the diagnostic adapter records into.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, Ordering};

use thiserror::Error;

static EXIT_CODE: AtomicI32 = AtomicI32::new(0);

pub fn util_name() -> &'static str {
    "list-directory"
}

pub fn set_exit_code(code: i32) {
    EXIT_CODE.store(code, Ordering::SeqCst);
}

pub fn get_exit_code() -> i32 {
    EXIT_CODE.load(Ordering::SeqCst)
}

#[derive(Debug, Error)]
pub enum LsError {
    /// A directory could not be opened, or an explicit argument could not be
    /// reached at all. Recoverable: the run continues with other arguments.
    #[error("cannot access '{}': {source}", .path.display())]
    CannotAccess { path: PathBuf, source: io::Error },

    /// Metadata fetch failed for one entry (e.g. it was unlinked between the
    /// directory read and the stat). The entry is dropped, the listing goes on.
    #[error("cannot stat '{}': {source}", .path.display())]
    CannotStat { path: PathBuf, source: io::Error },

    /// Cycle guard: this directory is an ancestor of itself on the current
    /// traversal path (hard link or bind mount), so it is not listed again.
    #[error("not listing already-listed directory '{}'", .0.display())]
    AlreadyListed(PathBuf),

    #[error("{0}")]
    Io(#[from] io::Error),
}

impl LsError {
    pub fn code(&self) -> i32 {
        match self {
            Self::CannotAccess { .. } | Self::CannotStat { .. } | Self::Io(_) => 1,
            Self::AlreadyListed(_) => 2,
        }
    }
}

/// Report a recoverable error on stderr and record its exit code.
macro_rules! show {
    ($err:expr) => {{
        let err = $err;
        $crate::error::set_exit_code(err.code());
        eprintln!("{}: {err}", $crate::error::util_name());
    }};
}
