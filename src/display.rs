//! Rendering: long-format lines, the column grid, totals, and the helpers
//! they share. Everything here consumes an already-sorted entry sequence;
//! ordering and traversal decisions are made by the caller.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fmt::Write as FmtWrite;
use std::fs::{self, Metadata};
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt};

use libc::{S_IXGRP, S_IXOTH, S_IXUSR};
use term_grid::{DEFAULT_SEPARATOR_SIZE, Direction, Filling, Grid, GridOptions};

use crate::human::{SizeFormat, block_size_string, human_readable};
use crate::time::{LONG_FORMAT, format_system_time, metadata_system_time};
use crate::{Config, Entry, Format, entries};

/// Mutable rendering state threaded through one listing run: the output
/// stream plus the owner/group name caches.
pub struct ListState<W: Write> {
    pub out: W,
    uid_cache: HashMap<u32, String>,
    gid_cache: HashMap<u32, String>,
}

impl<W: Write> ListState<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            uid_cache: HashMap::new(),
            gid_cache: HashMap::new(),
        }
    }
}

fn write_os_str<W: Write>(writer: &mut W, string: &OsStr) -> std::io::Result<()> {
    writer.write_all(string.as_bytes())
}

/// An entry name ready for output: raw bytes, or with every non-printable
/// byte replaced by `?` under `-q`.
pub fn display_name(name: &OsStr, config: &Config) -> OsString {
    if !config.printable_only {
        return name.to_os_string();
    }
    name.as_bytes()
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            }
        })
        .collect::<String>()
        .into()
}

/// The `total` line shown above long and `-s` listings. Totals arrive as the
/// raw sums the collector accumulated; scaling happens here.
pub fn render_total(total_blocks: u64, total_bytes: u64, size_format: SizeFormat) -> String {
    match size_format {
        SizeFormat::HumanReadable => format!("total {}K", total_bytes.div_ceil(1024)),
        SizeFormat::Kilobytes => format!("total {}", (total_blocks + 1) / 2),
        SizeFormat::Blocks => format!("total {total_blocks}"),
    }
}

/// `-rwxr-xr-x`-style mode string, with setuid/setgid/sticky folded into the
/// execute positions.
pub fn display_permissions(mode: u32, include_file_type: bool) -> String {
    let mut result = String::with_capacity(10);
    if include_file_type {
        result.push(file_type_char(mode));
    }

    let triplets = [
        (libc::S_IRUSR, libc::S_IWUSR, libc::S_IXUSR, libc::S_ISUID as u32, 's'),
        (libc::S_IRGRP, libc::S_IWGRP, libc::S_IXGRP, libc::S_ISGID as u32, 's'),
        (libc::S_IROTH, libc::S_IWOTH, libc::S_IXOTH, libc::S_ISVTX as u32, 't'),
    ];
    for (read, write, exec, special, special_char) in triplets {
        result.push(if mode & (read as u32) != 0 { 'r' } else { '-' });
        result.push(if mode & (write as u32) != 0 { 'w' } else { '-' });
        result.push(match (mode & (exec as u32) != 0, mode & special != 0) {
            (true, true) => special_char,
            (false, true) => special_char.to_ascii_uppercase(),
            (true, false) => 'x',
            (false, false) => '-',
        });
    }
    result
}

fn file_type_char(mode: u32) -> char {
    match mode & (libc::S_IFMT as u32) {
        m if m == libc::S_IFDIR as u32 => 'd',
        m if m == libc::S_IFLNK as u32 => 'l',
        m if m == libc::S_IFSOCK as u32 => 's',
        m if m == libc::S_IFIFO as u32 => 'p',
        m if m == libc::S_IFBLK as u32 => 'b',
        m if m == libc::S_IFCHR as u32 => 'c',
        _ => '-',
    }
}

/// The `-F` indicator for an entry, if it gets one.
pub fn classify_file(entry: &Entry) -> Option<char> {
    let md = entry.metadata()?;
    let ft = md.file_type();
    if ft.is_dir() {
        Some('/')
    } else if ft.is_symlink() {
        Some('@')
    } else if ft.is_socket() {
        Some('=')
    } else if ft.is_fifo() {
        Some('|')
    } else if ft.is_file() && md.mode() & ((S_IXUSR | S_IXGRP | S_IXOTH) as u32) != 0 {
        Some('*')
    } else {
        None
    }
}

fn display_uname<'a, W: Write>(md: &Metadata, state: &'a mut ListState<W>) -> &'a String {
    let uid = md.uid();
    state
        .uid_cache
        .entry(uid)
        .or_insert_with(|| entries::uid2usr(uid).unwrap_or_else(|_| uid.to_string()))
}

fn display_group<'a, W: Write>(md: &Metadata, state: &'a mut ListState<W>) -> &'a String {
    let gid = md.gid();
    state
        .gid_cache
        .entry(gid)
        .or_insert_with(|| entries::gid2grp(gid).unwrap_or_else(|_| gid.to_string()))
}

fn display_size(md: &Metadata, config: &Config) -> String {
    match config.size_format {
        SizeFormat::HumanReadable => format!("{:>6}", human_readable(md.len())),
        _ => format!("{:>8}", md.len()),
    }
}

fn display_block_column(entry: &Entry, config: &Config) -> String {
    let value = entry
        .metadata()
        .map_or_else(|| "?".to_string(), |md| block_size_string(md.blocks(), config.size_format));
    match config.size_format {
        SizeFormat::HumanReadable => format!("{value:>6} "),
        _ => format!("{value:>4} "),
    }
}

fn display_inode(entry: &Entry) -> String {
    let value = entry
        .metadata()
        .map_or_else(|| "?".to_string(), |md| md.ino().to_string());
    format!("{value:>9} ")
}

/// Write one `ls -l` line for `entry`.
///
/// Field order: inode and block columns when requested, mode string, link
/// count, owner, group, size, timestamp, name, symlink target, classify
/// suffix. Owner and group render numerically under `-n`.
pub fn display_item_long<W: Write>(
    entry: &Entry,
    config: &Config,
    state: &mut ListState<W>,
) -> std::io::Result<()> {
    let mut output_display: Vec<u8> = Vec::with_capacity(128);

    if config.inode {
        write!(output_display, "{}", display_inode(entry))?;
    }
    if config.alloc_size {
        write!(output_display, "{}", display_block_column(entry, config))?;
    }

    match entry.metadata() {
        Some(md) => {
            write!(output_display, "{}", display_permissions(md.mode(), true))?;
            write!(output_display, " {:>3}", md.nlink())?;

            if config.numeric_uid_gid {
                write!(output_display, " {:<8}", md.uid())?;
                write!(output_display, " {:<8}", md.gid())?;
            } else {
                write!(output_display, " {:<8}", display_uname(md, state))?;
                write!(output_display, " {:<8}", display_group(md, state))?;
            }

            write!(output_display, " {}", display_size(md, config))?;

            output_display.push(b' ');
            match metadata_system_time(md, config.time) {
                Some(time) => format_system_time(&mut output_display, time, LONG_FORMAT)?,
                None => output_display.extend_from_slice(b"???"),
            }

            output_display.push(b' ');
            write_os_str(&mut output_display, &display_name(entry.name(), config))?;

            if md.file_type().is_symlink() {
                if let Ok(target) = fs::read_link(entry.path()) {
                    write!(output_display, " -> ")?;
                    write_os_str(&mut output_display, target.as_os_str())?;
                }
            }
        }
        None => {
            write!(output_display, "??????????")?;
            output_display.push(b' ');
            write_os_str(&mut output_display, &display_name(entry.name(), config))?;
        }
    }

    if config.classify {
        if let Some(c) = classify_file(entry) {
            write!(output_display, "{c}")?;
        }
    }

    output_display.push(b'\n');
    state.out.write_all(&output_display)
}

fn display_cell(entry: &Entry, config: &Config) -> String {
    let mut cell = String::new();
    if config.inode {
        cell.push_str(&display_inode(entry));
    }
    if config.alloc_size {
        cell.push_str(&display_block_column(entry, config));
    }
    cell.push_str(&display_name(entry.name(), config).to_string_lossy());
    if config.classify {
        if let Some(c) = classify_file(entry) {
            write!(cell, "{c}").unwrap();
        }
    }
    cell
}

/// Render an ordered entry sequence: one long line per entry under `-l`/`-n`,
/// otherwise a top-to-bottom grid fitted to the configured width.
pub fn display_items<W: Write>(
    items: &[Entry],
    config: &Config,
    state: &mut ListState<W>,
) -> std::io::Result<()> {
    if config.format == Format::Long {
        for item in items {
            display_item_long(item, config, state)?;
        }
        return Ok(());
    }

    if items.is_empty() {
        return Ok(());
    }

    let cells: Vec<String> = items.iter().map(|item| display_cell(item, config)).collect();
    let grid = Grid::new(
        cells,
        GridOptions {
            filling: Filling::Spaces(DEFAULT_SEPARATOR_SIZE),
            direction: Direction::TopToBottom,
            width: config.width as usize,
        },
    );
    write!(state.out, "{grid}")
}
