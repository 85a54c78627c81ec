//! Behavioral tests for the collection, sorting and traversal engine,
//! exercised through the library API against real temporary trees.

use std::fs::{self, File};
use std::os::unix::fs::symlink;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use tempfile::TempDir;

use list_directory::{
    Config, ListState, app, collect_subdirectories, list, list_file, read_directory,
};

fn config_for(args: &[&str]) -> Config {
    let mut argv = vec!["list-directory"];
    argv.extend_from_slice(args);
    Config::from(&app().get_matches_from(argv))
}

fn entry_names(listing: &list_directory::Listing) -> Vec<String> {
    listing
        .entries
        .iter()
        .map(|e| e.name().to_string_lossy().into_owned())
        .collect()
}

fn render<F: FnOnce(&mut ListState<Vec<u8>>)>(f: F) -> String {
    let mut state = ListState::new(Vec::new());
    f(&mut state);
    String::from_utf8(state.out.clone()).unwrap()
}

fn populate_dotfile_tree(dir: &Path) {
    fs::write(dir.join("visible"), b"v").unwrap();
    fs::write(dir.join(".hidden"), b"h").unwrap();
}

#[test]
fn default_mode_excludes_dotfiles() {
    let tmp = TempDir::new().unwrap();
    populate_dotfile_tree(tmp.path());

    let listing = read_directory(tmp.path(), &config_for(&[])).unwrap();
    assert_eq!(entry_names(&listing), ["visible"]);
}

#[test]
fn show_all_includes_dot_and_dot_dot() {
    let tmp = TempDir::new().unwrap();
    populate_dotfile_tree(tmp.path());

    let listing = read_directory(tmp.path(), &config_for(&["-a"])).unwrap();
    assert_eq!(entry_names(&listing), [".", "..", ".hidden", "visible"]);
}

#[test]
fn almost_all_keeps_dotfiles_but_not_the_literals() {
    let tmp = TempDir::new().unwrap();
    populate_dotfile_tree(tmp.path());

    let listing = read_directory(tmp.path(), &config_for(&["-A"])).unwrap();
    assert_eq!(entry_names(&listing), [".hidden", "visible"]);
}

#[test]
fn name_sort_end_to_end() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("b.txt"), vec![b'b'; 100]).unwrap();
    fs::write(tmp.path().join("a.txt"), vec![b'a'; 50]).unwrap();
    fs::create_dir(tmp.path().join("sub")).unwrap();

    let listing = read_directory(tmp.path(), &config_for(&[])).unwrap();
    assert_eq!(entry_names(&listing), ["a.txt", "b.txt", "sub"]);
}

#[test]
fn size_sort_puts_largest_first() {
    let tmp = TempDir::new().unwrap();
    // both files are larger than any directory's own size
    fs::write(tmp.path().join("b.txt"), vec![b'b'; 200_000]).unwrap();
    fs::write(tmp.path().join("a.txt"), vec![b'a'; 100_000]).unwrap();
    fs::create_dir(tmp.path().join("sub")).unwrap();

    let listing = read_directory(tmp.path(), &config_for(&["-S"])).unwrap();
    assert_eq!(entry_names(&listing), ["b.txt", "a.txt", "sub"]);
}

#[test]
fn time_sort_uses_modification_time() {
    let tmp = TempDir::new().unwrap();
    for (name, secs) in [("older", 1_000_000u64), ("newest", 3_000_000), ("middle", 2_000_000)] {
        let path = tmp.path().join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
    }

    let listing = read_directory(tmp.path(), &config_for(&["-t"])).unwrap();
    assert_eq!(entry_names(&listing), ["newest", "middle", "older"]);
}

#[test]
fn reverse_inverts_a_sorted_listing() {
    let tmp = TempDir::new().unwrap();
    for name in ["one", "two", "three"] {
        fs::write(tmp.path().join(name), b"x").unwrap();
    }

    let listing = read_directory(tmp.path(), &config_for(&["-r"])).unwrap();
    assert_eq!(entry_names(&listing), ["two", "three", "one"]);
}

#[test]
fn reverse_with_unsorted_is_a_no_op() {
    let tmp = TempDir::new().unwrap();
    for name in ["one", "two", "three", "four", "five"] {
        fs::write(tmp.path().join(name), b"x").unwrap();
    }

    let plain = read_directory(tmp.path(), &config_for(&["-f"])).unwrap();
    let reversed = read_directory(tmp.path(), &config_for(&["-f", "-r"])).unwrap();
    assert_eq!(entry_names(&plain), entry_names(&reversed));
}

#[test]
fn last_sort_flag_wins() {
    use list_directory::Sort;
    use list_directory::time::TimeField;

    assert_eq!(config_for(&["-t", "-S"]).sort, Sort::Size);
    assert_eq!(config_for(&["-S", "-t"]).sort, Sort::Time(TimeField::Modification));
    assert_eq!(config_for(&["-S", "-t", "-u"]).sort, Sort::Time(TimeField::Access));
    assert_eq!(config_for(&["-t", "-f"]).sort, Sort::None);
    assert_eq!(config_for(&["-u", "-c"]).time, TimeField::Change);
    assert_eq!(config_for(&["-c", "-u"]).time, TimeField::Access);
}

#[test]
fn totals_accumulate_raw_blocks_and_bytes() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a"), vec![0u8; 5000]).unwrap();
    fs::write(tmp.path().join("b"), vec![0u8; 12_000]).unwrap();

    let listing = read_directory(tmp.path(), &config_for(&["-l"])).unwrap();
    let expected_blocks: u64 = listing
        .entries
        .iter()
        .map(|e| {
            use std::os::unix::fs::MetadataExt;
            e.metadata().unwrap().blocks()
        })
        .sum();
    assert_eq!(listing.total_blocks, expected_blocks);
    assert_eq!(listing.total_bytes, 17_000);
}

#[test]
fn metadata_is_skipped_when_no_flag_needs_it() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a"), b"abc").unwrap();

    let listing = read_directory(tmp.path(), &config_for(&[])).unwrap();
    assert!(listing.entries[0].metadata().is_none());
    assert_eq!(listing.total_blocks, 0);
    assert_eq!(listing.total_bytes, 0);

    let listing = read_directory(tmp.path(), &config_for(&["-l"])).unwrap();
    assert!(listing.entries[0].metadata().is_some());
}

#[test]
fn unreadable_directory_is_an_error_value() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope");
    assert!(read_directory(&missing, &config_for(&[])).is_err());
    assert!(collect_subdirectories(&missing, &config_for(&[])).is_err());
}

#[test]
fn subdirectory_collection_skips_symlinked_directories() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("real")).unwrap();
    symlink(tmp.path(), tmp.path().join("loop")).unwrap();
    fs::write(tmp.path().join("file"), b"x").unwrap();

    let (subdirs, failures) = collect_subdirectories(tmp.path(), &config_for(&["-R"])).unwrap();
    let names: Vec<_> = subdirs
        .iter()
        .map(|e| e.path().file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["real"]);
    assert!(failures.is_empty());
}

#[test]
fn subdirectory_names_are_full_paths_sorted() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("zed")).unwrap();
    fs::create_dir(tmp.path().join("arc")).unwrap();

    let (subdirs, _) = collect_subdirectories(tmp.path(), &config_for(&["-R"])).unwrap();
    let names: Vec<_> = subdirs
        .iter()
        .map(|e| e.name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        [
            tmp.path().join("arc").to_string_lossy().into_owned(),
            tmp.path().join("zed").to_string_lossy().into_owned(),
        ]
    );
}

#[test]
fn recursive_walk_terminates_despite_symlink_cycle() {
    let tmp = TempDir::new().unwrap();
    let sub = tmp.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("inner"), b"x").unwrap();
    symlink(tmp.path(), sub.join("back")).unwrap();

    let config = config_for(&["-R"]);
    let output = render(|state| {
        list(&[tmp.path().to_path_buf()], &config, state).unwrap();
    });

    // the subdirectory is listed exactly once, the ancestor never again
    let header = format!("{}:", sub.display());
    assert_eq!(output.matches(&header).count(), 1);
    assert_eq!(output.matches("inner").count(), 1);
}

#[test]
fn recursive_walk_prints_separators_and_headers_in_sorted_order() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("beta")).unwrap();
    fs::create_dir(tmp.path().join("alpha")).unwrap();
    fs::write(tmp.path().join("alpha").join("leaf"), b"x").unwrap();

    let config = config_for(&["-R"]);
    let output = render(|state| {
        list(&[tmp.path().to_path_buf()], &config, state).unwrap();
    });

    let alpha_header = format!("\n{}:\n", tmp.path().join("alpha").display());
    let beta_header = format!("\n{}:\n", tmp.path().join("beta").display());
    let alpha_at = output.find(&alpha_header).expect("alpha section missing");
    let beta_at = output.find(&beta_header).expect("beta section missing");
    assert!(alpha_at < beta_at);
    // a single argument gets no top-level header
    assert!(!output.starts_with(&format!("{}:", tmp.path().display())));
}

#[test]
fn explicit_file_argument_never_reads_a_directory() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("inside"), b"x").unwrap();

    let config = config_for(&["-d", "-l"]);
    let output = render(|state| {
        list(&[tmp.path().to_path_buf()], &config, state).unwrap();
    });

    assert!(!output.contains("inside"));
    assert!(output.trim_end().ends_with(&tmp.path().to_string_lossy().into_owned()));
    assert!(output.starts_with('d'));
}

#[test]
fn single_file_simple_rendering_is_just_the_name() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("lonely");
    fs::write(&path, b"x").unwrap();

    let config = config_for(&[]);
    let output = render(|state| {
        list_file(&path, &config, state).unwrap();
    });
    assert_eq!(output, format!("{}\n", path.display()));
}

#[test]
fn long_listing_has_mode_string_and_total() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("data"), vec![0u8; 2048]).unwrap();

    let config = config_for(&["-l"]);
    let output = render(|state| {
        list(&[tmp.path().to_path_buf()], &config, state).unwrap();
    });

    let mut lines = output.lines();
    assert!(lines.next().unwrap().starts_with("total "));
    let entry_line = lines.next().unwrap();
    assert!(entry_line.starts_with("-rw"));
    assert!(entry_line.contains(" 2048 "));
    assert!(entry_line.ends_with("data"));
}

#[test]
fn long_listing_shows_symlink_target() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("target"), b"x").unwrap();
    symlink("target", tmp.path().join("alias")).unwrap();

    let config = config_for(&["-l"]);
    let output = render(|state| {
        list(&[tmp.path().to_path_buf()], &config, state).unwrap();
    });

    let alias_line = output
        .lines()
        .find(|line| line.contains("alias"))
        .expect("symlink line missing");
    assert!(alias_line.starts_with('l'));
    assert!(alias_line.ends_with("alias -> target"));
}

#[test]
fn classify_appends_directory_slash() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("folder")).unwrap();
    fs::write(tmp.path().join("plain"), b"x").unwrap();

    let config = config_for(&["-F"]);
    let output = render(|state| {
        list(&[tmp.path().to_path_buf()], &config, state).unwrap();
    });
    assert!(output.contains("folder/"));
    assert!(output.contains("plain"));
    assert!(!output.contains("plain*"));
}
