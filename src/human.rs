//! Size-unit selection and human-readable size strings.

/// How sizes derived from block counts are scaled for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SizeFormat {
    /// Raw 512-byte block counts.
    #[default]
    Blocks,
    /// 1024-byte units, rounded up (`-k`).
    Kilobytes,
    /// `1.5K`-style strings (`-h`).
    HumanReadable,
}

static UNITS: [&str; 6] = ["B", "K", "M", "G", "T", "P"];

/// Format a byte count as `<value>.<tenth><unit>` with 1024-based units.
pub fn human_readable(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1}{}", UNITS[unit])
}

/// The `-s` column value for an entry with the given raw block count.
pub fn block_size_string(blocks: u64, format: SizeFormat) -> String {
    match format {
        SizeFormat::HumanReadable => human_readable(blocks * 512),
        SizeFormat::Kilobytes => ((blocks + 1) / 2).to_string(),
        SizeFormat::Blocks => blocks.to_string(),
    }
}
