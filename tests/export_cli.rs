//! End-to-end tests for the export-pages binary and its exit codes.

use assert_cmd::Command;
use cached_crawl::export::export_filename;
use cached_crawl::storage::{PageRow, SqliteStorage, Storage};
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Writes a config naming `db_path` and returns the config path
fn write_config(dir: &Path, db_path: &Path) -> PathBuf {
    let config_path = dir.join("crawl.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[crawler]
concurrent-requests = 1
credits-threshold = 10

[database]
path = '{}'

[proxy]
url = ""
"#,
            db_path.display()
        ),
    )
    .unwrap();
    config_path
}

/// Creates a store holding one page and returns its id
fn store_page(db_path: &Path, url: &str, body: &str) -> i64 {
    let mut store = SqliteStorage::new(db_path, Duration::from_secs(5)).unwrap();
    store
        .insert(&PageRow {
            id: None,
            url: url.to_string(),
            status: 200,
            encoding: "utf-8".to_string(),
            headers: "{}".to_string(),
            date: None,
            body: body.to_string(),
        })
        .unwrap()
}

fn export_pages() -> Command {
    Command::cargo_bin("export-pages").unwrap()
}

#[test]
fn test_no_arguments_exits_one() {
    let assert = export_pages().assert().failure();
    assert_eq!(assert.get_output().status.code(), Some(1));
}

#[test]
fn test_directory_without_ids_exits_one() {
    let out = TempDir::new().unwrap();
    let assert = export_pages().arg(out.path()).assert().failure();
    assert_eq!(assert.get_output().status.code(), Some(1));
}

#[test]
fn test_missing_directory_exits_one() {
    let assert = export_pages()
        .arg("/nonexistent/cached-crawl-export")
        .arg("1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a path to a directory that exists"));
    assert_eq!(assert.get_output().status.code(), Some(1));
}

#[test]
fn test_non_integer_id_exits_one() {
    let out = TempDir::new().unwrap();
    let assert = export_pages()
        .arg(out.path())
        .arg("abc")
        .assert()
        .failure();
    assert_eq!(assert.get_output().status.code(), Some(1));
}

#[test]
fn test_unknown_id_exits_one() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let db_path = dir.path().join("pages.db");
    let id = store_page(&db_path, "https://example.com/docs.html", "<p>docs</p>");
    let config_path = write_config(dir.path(), &db_path);

    let assert = export_pages()
        .arg("--config")
        .arg(&config_path)
        .arg(out.path())
        .arg((id + 100).to_string())
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not correspond to a stored page"));
    assert_eq!(assert.get_output().status.code(), Some(1));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_database_exits_one_without_creating_it() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let db_path = dir.path().join("never-crawled.db");
    let config_path = write_config(dir.path(), &db_path);

    let assert = export_pages()
        .arg("--config")
        .arg(&config_path)
        .arg(out.path())
        .arg("1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("opening database"));
    assert_eq!(assert.get_output().status.code(), Some(1));
    assert!(!db_path.exists());
}

#[test]
fn test_export_writes_page_body() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let db_path = dir.path().join("pages.db");
    let url = "https://example.com/docs.html";
    let id = store_page(&db_path, url, "<p>caf\u{e9}</p>");
    let config_path = write_config(dir.path(), &db_path);

    export_pages()
        .arg("--config")
        .arg(&config_path)
        .arg(out.path())
        .arg(id.to_string())
        .assert()
        .success();

    let written = out.path().join(export_filename(url));
    assert_eq!(std::fs::read_to_string(written).unwrap(), "<p>caf\u{e9}</p>");
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 1);
}
