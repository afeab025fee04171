//! Saving to disk

use std::fs;

use haconf::haconf::testing;
use haconf::{ConfigParser, Options, Record, SectionKind};
use tempfile::TempDir;

#[test]
fn test_save_writes_rendered_text() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("haproxy.cfg");

    let parser = ConfigParser::default();
    parser.load_data(testing::ROUND_TRIP_FIXTURE).unwrap();
    parser
        .insert(SectionKind::Global, "", "maxconn", Record::int(2000), None)
        .unwrap();
    parser.save(&path).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("global\n  master-worker\n  maxconn 2000\n"));

    let reloaded = ConfigParser::default();
    reloaded.load_path(&path).unwrap();
    assert_eq!(reloaded.to_string(), written);
}

#[test]
fn test_save_replaces_and_leaves_only_lock_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("haproxy.cfg");
    fs::write(&path, "stale contents that are much longer than the new ones\n").unwrap();

    let parser = ConfigParser::default();
    parser.load_data("global\n  daemon\n").unwrap();
    parser.save(&path).unwrap();
    parser.save(&path).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "global\n  daemon\n");

    let mut entries: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries, vec!["haproxy.cfg", "haproxy.cfg.lock"]);
}

#[test]
fn test_save_with_hash() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("haproxy.cfg");

    let parser = ConfigParser::new(Options::default().use_md5_hash(true));
    parser.load_data("global\n  daemon\n").unwrap();
    parser.save(&path).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("# _md5hash="));
    assert_eq!(written, parser.string_with_hash());
}

#[test]
fn test_save_into_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("haproxy.cfg");

    let parser = ConfigParser::default();
    assert!(matches!(parser.save(&path), Err(haconf::Error::Io(_))));
}

#[test]
fn test_load_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let parser = ConfigParser::default();
    assert!(matches!(
        parser.load_path(dir.path().join("nope.cfg")),
        Err(haconf::Error::Io(_))
    ));
}
