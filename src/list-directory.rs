//! Enumerate directory contents or report single-file metadata, sorted under
//! one of several orders, optionally recursing through subdirectory trees.
//!
//! The listing pipeline is: collect one directory's entries with metadata
//! attached when any metadata-dependent flag is active ([`read_directory`]),
//! order them ([`sort::sort_entries`]), and hand the result to the rendering
//! layer ([`display`]). Recursion re-scans each directory for its
//! subdirectories, skipping symbolic links so link loops cannot recurse
//! forever, and walks them depth-first in sorted order.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs::{self, Metadata};
use std::io::{BufWriter, IsTerminal, Write, stdout};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command, builder::ValueParser, crate_version};

#[macro_use]
pub mod error;
pub mod display;
pub mod entries;
pub mod human;
pub mod sort;
pub mod time;

pub use display::ListState;
pub use error::LsError;
use human::SizeFormat;
use time::TimeField;

pub mod options {
    pub mod format {
        pub static LONG: &str = "long";
        pub static NUMERIC_UID_GID: &str = "numeric-uid-gid";
    }

    pub mod files {
        pub static ALL: &str = "all";
        pub static ALMOST_ALL: &str = "almost-all";
    }

    pub mod sort {
        pub static SIZE: &str = "S";
        pub static TIME: &str = "t";
        pub static NONE: &str = "f";
    }

    pub mod time {
        pub static ACCESS: &str = "u";
        pub static CHANGE: &str = "c";
    }

    pub mod size {
        pub static HUMAN_READABLE: &str = "human-readable";
        pub static KILOBYTES: &str = "kilobytes";
        pub static ALLOCATION_SIZE: &str = "size";
    }

    pub static HELP: &str = "help";
    pub static CLASSIFY: &str = "classify";
    pub static RECURSIVE: &str = "recursive";
    pub static REVERSE: &str = "reverse";
    pub static INODE: &str = "inode";
    pub static DIRECTORY: &str = "directory";
    pub static HIDE_CONTROL_CHARS: &str = "hide-control-chars";
    pub static SHOW_CONTROL_CHARS: &str = "show-control-chars";
    pub static PATHS: &str = "paths";
}

const DEFAULT_TERM_WIDTH: u16 = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Columns,
    Long,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Files {
    /// `-a`: everything, `.` and `..` included.
    All,
    /// `-A`: dotfiles included, the literal `.`/`..` excluded.
    AlmostAll,
    /// Default: names starting with `.` excluded.
    Normal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sort {
    None,
    Name,
    Size,
    Time(TimeField),
}

pub struct Config {
    pub format: Format,
    pub files: Files,
    pub sort: Sort,
    /// Which timestamp long format displays; also the `-t` sort key.
    pub time: TimeField,
    pub recursive: bool,
    pub reverse: bool,
    pub size_format: SizeFormat,
    pub inode: bool,
    /// `-s`: leading block-count column.
    pub alloc_size: bool,
    /// `-d`: list arguments themselves, never their contents.
    pub directory: bool,
    pub classify: bool,
    pub numeric_uid_gid: bool,
    pub printable_only: bool,
    pub width: u16,
}

/// Extracts the type of files to display.
fn extract_files(options: &ArgMatches) -> Files {
    if options.get_flag(options::files::ALL) {
        Files::All
    } else if options.get_flag(options::files::ALMOST_ALL) {
        Files::AlmostAll
    } else {
        Files::Normal
    }
}

/// Extracts the timestamp field selected by `-u`/`-c` (the flags are a
/// last-one-wins override pair).
fn extract_time_field(options: &ArgMatches) -> TimeField {
    if options.get_flag(options::time::ACCESS) {
        TimeField::Access
    } else if options.get_flag(options::time::CHANGE) {
        TimeField::Change
    } else {
        TimeField::Modification
    }
}

/// Extracts the sorting method. `-f`, `-t` and `-S` override each other at
/// the parser level, so at most one of them survives here.
fn extract_sort(options: &ArgMatches, time: TimeField) -> Sort {
    if options.get_flag(options::sort::NONE) {
        Sort::None
    } else if options.get_flag(options::sort::TIME) {
        Sort::Time(time)
    } else if options.get_flag(options::sort::SIZE) {
        Sort::Size
    } else {
        Sort::Name
    }
}

fn extract_size_format(options: &ArgMatches) -> SizeFormat {
    if options.get_flag(options::size::HUMAN_READABLE) {
        SizeFormat::HumanReadable
    } else if options.get_flag(options::size::KILOBYTES) {
        SizeFormat::Kilobytes
    } else {
        SizeFormat::Blocks
    }
}

impl Config {
    pub fn from(options: &ArgMatches) -> Self {
        let format = if options.get_flag(options::format::LONG)
            || options.get_flag(options::format::NUMERIC_UID_GID)
        {
            Format::Long
        } else {
            Format::Columns
        };

        let time = extract_time_field(options);

        // -q defaults to on when stdout is a terminal, -w turns it back off
        let printable_only = if options.get_flag(options::HIDE_CONTROL_CHARS) {
            true
        } else if options.get_flag(options::SHOW_CONTROL_CHARS) {
            false
        } else {
            stdout().is_terminal()
        };

        let width = terminal_size::terminal_size()
            .map_or(DEFAULT_TERM_WIDTH, |(width, _)| width.0);

        Self {
            format,
            files: extract_files(options),
            sort: extract_sort(options, time),
            time,
            recursive: options.get_flag(options::RECURSIVE),
            reverse: options.get_flag(options::REVERSE),
            size_format: extract_size_format(options),
            inode: options.get_flag(options::INODE),
            alloc_size: options.get_flag(options::size::ALLOCATION_SIZE),
            directory: options.get_flag(options::DIRECTORY),
            classify: options.get_flag(options::CLASSIFY),
            numeric_uid_gid: options.get_flag(options::format::NUMERIC_UID_GID),
            printable_only,
            width,
        }
    }

    /// Whether any active flag needs per-entry metadata during collection.
    pub fn needs_metadata(&self) -> bool {
        self.format == Format::Long
            || self.inode
            || self.alloc_size
            || self.classify
            || !matches!(self.sort, Sort::Name | Sort::None)
    }
}

pub fn app() -> Command {
    Command::new(error::util_name())
        .version(crate_version!())
        .about("List directory contents, sorted, with optional recursion into subdirectories")
        .override_usage("list-directory [OPTION]... [FILE]...")
        .infer_long_args(true)
        .args_override_self(true)
        .disable_help_flag(true)
        .arg(
            Arg::new(options::HELP)
                .long(options::HELP)
                .help("Print help information")
                .action(ArgAction::Help),
        )
        .arg(
            Arg::new(options::files::ALL)
                .short('a')
                .long(options::files::ALL)
                .help("Include entries starting with '.', including '.' and '..'")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::files::ALMOST_ALL)
                .short('A')
                .long(options::files::ALMOST_ALL)
                .help("Include entries starting with '.', except '.' and '..'")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::format::LONG)
                .short('l')
                .long(options::format::LONG)
                .help("Use the long listing format")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::format::NUMERIC_UID_GID)
                .short('n')
                .long(options::format::NUMERIC_UID_GID)
                .help("Long listing with numeric owner and group ids")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::CLASSIFY)
                .short('F')
                .long(options::CLASSIFY)
                .help("Append an indicator (one of */=@|) to entries")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::RECURSIVE)
                .short('R')
                .long(options::RECURSIVE)
                .help("List subdirectories recursively")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::REVERSE)
                .short('r')
                .long(options::REVERSE)
                .help("Reverse the sort order")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::sort::NONE)
                .short('f')
                .help("Do not sort; list entries in directory order")
                .overrides_with_all([options::sort::NONE, options::sort::TIME, options::sort::SIZE])
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::sort::SIZE)
                .short('S')
                .help("Sort by file size, largest first")
                .overrides_with_all([options::sort::NONE, options::sort::TIME, options::sort::SIZE])
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::sort::TIME)
                .short('t')
                .help("Sort by time, newest first (see -u, -c)")
                .overrides_with_all([options::sort::NONE, options::sort::TIME, options::sort::SIZE])
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::time::ACCESS)
                .short('u')
                .help("Use last access time for display and for -t sorting")
                .overrides_with_all([options::time::ACCESS, options::time::CHANGE])
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::time::CHANGE)
                .short('c')
                .help("Use last status change time for display and for -t sorting")
                .overrides_with_all([options::time::ACCESS, options::time::CHANGE])
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::size::HUMAN_READABLE)
                .short('h')
                .long(options::size::HUMAN_READABLE)
                .help("Print sizes in human readable form (e.g. 1.5K, 234.0M)")
                .overrides_with_all([options::size::HUMAN_READABLE, options::size::KILOBYTES])
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::size::KILOBYTES)
                .short('k')
                .long(options::size::KILOBYTES)
                .help("Print block counts in 1K units")
                .overrides_with_all([options::size::HUMAN_READABLE, options::size::KILOBYTES])
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::INODE)
                .short('i')
                .long(options::INODE)
                .help("Print each entry's inode number")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::size::ALLOCATION_SIZE)
                .short('s')
                .long(options::size::ALLOCATION_SIZE)
                .help("Print the allocated blocks of each entry")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::DIRECTORY)
                .short('d')
                .long(options::DIRECTORY)
                .help("List directories themselves, not their contents")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::HIDE_CONTROL_CHARS)
                .short('q')
                .long(options::HIDE_CONTROL_CHARS)
                .help("Replace non-printable characters in names with '?'")
                .overrides_with_all([options::HIDE_CONTROL_CHARS, options::SHOW_CONTROL_CHARS])
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::SHOW_CONTROL_CHARS)
                .short('w')
                .long(options::SHOW_CONTROL_CHARS)
                .help("Print non-printable characters as-is")
                .overrides_with_all([options::HIDE_CONTROL_CHARS, options::SHOW_CONTROL_CHARS])
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(options::PATHS)
                .action(ArgAction::Append)
                .value_parser(ValueParser::os_string())
                .value_hint(clap::ValueHint::AnyPath),
        )
}

/// One filesystem object discovered during a listing.
///
/// `name` is the bare file name for entries collected from a directory read,
/// and the full path for subdirectories gathered for recursion — the walker
/// prints whichever convention the buffer was built with.
pub struct Entry {
    name: OsString,
    path: PathBuf,
    md: Option<Metadata>,
}

impl Entry {
    pub fn new(name: OsString, path: PathBuf, md: Option<Metadata>) -> Self {
        Self { name, path, md }
    }

    pub fn name(&self) -> &OsStr {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.md.as_ref()
    }

    pub fn size(&self) -> u64 {
        self.md.as_ref().map_or(0, |md| md.len())
    }
}

/// The result of collecting one directory: its (sorted) entries, the raw
/// aggregate totals over every entry whose metadata was fetched, and the
/// per-entry failures the caller should report.
pub struct Listing {
    pub entries: Vec<Entry>,
    pub total_blocks: u64,
    pub total_bytes: u64,
    pub failures: Vec<LsError>,
}

/// Dotfile-inclusion policy as a pure predicate.
pub fn should_include(name: &OsStr, config: &Config) -> bool {
    match config.files {
        Files::All => true,
        Files::AlmostAll => name != "." && name != "..",
        Files::Normal => !name.as_encoded_bytes().starts_with(b"."),
    }
}

fn push_entry(listing: &mut Listing, name: OsString, path: PathBuf, config: &Config) {
    let md = if config.needs_metadata() {
        match fs::symlink_metadata(&path) {
            Ok(md) => {
                listing.total_blocks += md.blocks();
                listing.total_bytes += md.len();
                Some(md)
            }
            Err(source) => {
                listing.failures.push(LsError::CannotStat { path, source });
                return;
            }
        }
    } else {
        None
    };
    listing.entries.push(Entry::new(name, path, md));
}

/// Collect one directory's immediate children, filtered by the dotfile
/// policy, with metadata attached when any metadata-dependent flag is active
/// and the sequence ordered per `config`.
///
/// A directory that cannot be opened is an error for the caller to report;
/// a child that cannot be stat'ed is dropped and recorded in
/// [`Listing::failures`] without aborting the listing.
pub fn read_directory(path: &Path, config: &Config) -> Result<Listing, LsError> {
    let read_dir = fs::read_dir(path).map_err(|source| LsError::CannotAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let mut listing = Listing {
        entries: Vec::new(),
        total_blocks: 0,
        total_bytes: 0,
        failures: Vec::new(),
    };

    // read_dir never yields the '.' and '..' entries, so -a synthesizes them
    if config.files == Files::All {
        push_entry(&mut listing, OsString::from("."), path.to_path_buf(), config);
        push_entry(&mut listing, OsString::from(".."), path.join(".."), config);
    }

    for raw_entry in read_dir {
        let dir_entry = match raw_entry {
            Ok(entry) => entry,
            Err(err) => {
                listing.failures.push(LsError::Io(err));
                continue;
            }
        };
        if should_include(&dir_entry.file_name(), config) {
            push_entry(&mut listing, dir_entry.file_name(), dir_entry.path(), config);
        }
    }

    sort::sort_entries(&mut listing.entries, config);
    Ok(listing)
}

/// Re-scan `path` for the subdirectories to recurse into: same dotfile
/// policy as the listing itself, symbolic links excluded so link loops can
/// never recurse, entries named by full path and sorted per `config`.
pub fn collect_subdirectories(
    path: &Path,
    config: &Config,
) -> Result<(Vec<Entry>, Vec<LsError>), LsError> {
    let read_dir = fs::read_dir(path).map_err(|source| LsError::CannotAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let mut subdirs = Vec::new();
    let mut failures = Vec::new();

    for raw_entry in read_dir {
        let dir_entry = match raw_entry {
            Ok(entry) => entry,
            Err(err) => {
                failures.push(LsError::Io(err));
                continue;
            }
        };
        if !should_include(&dir_entry.file_name(), config) {
            continue;
        }
        let full_path = dir_entry.path();
        let md = match fs::symlink_metadata(&full_path) {
            Ok(md) => md,
            Err(source) => {
                failures.push(LsError::CannotStat { path: full_path, source });
                continue;
            }
        };
        if md.file_type().is_symlink() || !md.is_dir() {
            continue;
        }
        subdirs.push(Entry::new(
            full_path.clone().into_os_string(),
            full_path,
            Some(md),
        ));
    }

    sort::sort_entries(&mut subdirs, config);
    Ok((subdirs, failures))
}

/// List one directory: totals line when long format or `-s` is active, then
/// the rendered entries. Open failure is reported here and the run continues.
fn list_directory<W: Write>(
    path: &Path,
    config: &Config,
    state: &mut ListState<W>,
) -> std::io::Result<()> {
    let listing = match read_directory(path, config) {
        Ok(listing) => listing,
        Err(err) => {
            state.out.flush()?;
            show!(err);
            return Ok(());
        }
    };
    if !listing.failures.is_empty() {
        state.out.flush()?;
        for failure in &listing.failures {
            show!(failure);
        }
    }

    if config.format == Format::Long || config.alloc_size {
        writeln!(
            state.out,
            "{}",
            display::render_total(listing.total_blocks, listing.total_bytes, config.size_format)
        )?;
    }

    display::display_items(&listing.entries, config, state)
}

/// Depth-first recursive traversal rooted at `path`.
///
/// Lists the directory (with a `path:` header when requested), then walks its
/// sorted subdirectories, printing a blank separator before each. `ancestors`
/// holds the `(dev, inode)` pairs of the traversal path: a subdirectory
/// already on it (hard-link or bind-mount cycle that symlink exclusion cannot
/// catch) is reported and skipped instead of being listed again.
fn enter_directory<W: Write>(
    path: &Path,
    config: &Config,
    print_name: bool,
    state: &mut ListState<W>,
    ancestors: &mut HashSet<(u64, u64)>,
) -> std::io::Result<()> {
    if print_name {
        writeln!(state.out, "{}:", path.display())?;
    }
    list_directory(path, config, state)?;

    let (subdirs, failures) = match collect_subdirectories(path, config) {
        Ok(collected) => collected,
        Err(err) => {
            state.out.flush()?;
            show!(err);
            return Ok(());
        }
    };
    if !failures.is_empty() {
        state.out.flush()?;
        for failure in &failures {
            show!(failure);
        }
    }

    for subdir in &subdirs {
        let key = subdir.metadata().map(|md| (md.dev(), md.ino()));
        if let Some(key) = key {
            if !ancestors.insert(key) {
                state.out.flush()?;
                show!(LsError::AlreadyListed(subdir.path().to_path_buf()));
                continue;
            }
        }
        writeln!(state.out)?;
        enter_directory(subdir.path(), config, true, state, ancestors)?;
        if let Some(key) = key {
            ancestors.remove(&key);
        }
    }
    Ok(())
}

/// List a single explicitly named path without ever reading it as a
/// directory: long line under `-l`/`-n`, bare name otherwise.
pub fn list_file<W: Write>(
    path: &Path,
    config: &Config,
    state: &mut ListState<W>,
) -> std::io::Result<()> {
    let md = match fs::symlink_metadata(path) {
        Ok(md) => md,
        Err(source) => {
            state.out.flush()?;
            show!(LsError::CannotAccess {
                path: path.to_path_buf(),
                source,
            });
            return Ok(());
        }
    };
    let entry = Entry::new(path.as_os_str().to_os_string(), path.to_path_buf(), Some(md));

    if config.format == Format::Long {
        display::display_item_long(&entry, config, state)
    } else {
        let mut line = Vec::new();
        line.extend_from_slice(display::display_name(entry.name(), config).as_encoded_bytes());
        line.push(b'\n');
        state.out.write_all(&line)
    }
}

fn is_directory(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|md| md.is_dir())
}

/// Top-level dispatch over the argument list: single-file, one-shot
/// directory listing, or recursive traversal per argument.
pub fn list<W: Write>(
    locs: &[PathBuf],
    config: &Config,
    state: &mut ListState<W>,
) -> std::io::Result<()> {
    for loc in locs {
        if config.directory {
            list_file(loc, config, state)?;
            continue;
        }
        // command-line symlinks to directories are followed here, so a
        // symlinked directory argument lists its target
        if is_directory(loc) {
            if config.recursive {
                let mut ancestors = HashSet::new();
                if let Ok(md) = fs::metadata(loc) {
                    ancestors.insert((md.dev(), md.ino()));
                }
                enter_directory(loc, config, locs.len() > 1, state, &mut ancestors)?;
            } else {
                list_directory(loc, config, state)?;
            }
        } else {
            list_file(loc, config, state)?;
        }
    }
    Ok(())
}

pub fn run(args: impl IntoIterator<Item = OsString>) -> ExitCode {
    let matches = app().get_matches_from(args);
    let config = Config::from(&matches);

    let locs: Vec<PathBuf> = matches
        .get_many::<OsString>(options::PATHS)
        .map_or_else(|| vec![PathBuf::from(".")], |v| v.map(PathBuf::from).collect());

    let mut state = ListState::new(BufWriter::new(stdout()));
    if let Err(err) = list(&locs, &config, &mut state) {
        show!(LsError::Io(err));
    }
    if let Err(err) = state.out.flush() {
        show!(LsError::Io(err));
    }

    match u8::try_from(error::get_exit_code()) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    }
}
