use dry_core::storage::{EmbeddedEngine, Index, StorageLocator};
use dry_core::Error;
use tempfile::tempdir;

#[test]
fn test_not_unique_hashes_needs_two_records() {
    let mut db = EmbeddedEngine::open_in_memory().unwrap();

    db.write_file_info("/root/a.txt", "h1", 5).unwrap();
    assert!(db.not_unique_hashes().unwrap().is_empty());

    db.write_file_info("/root/b.txt", "h1", 5).unwrap();
    db.write_file_info("/root/c.txt", "h2", 7).unwrap();
    assert_eq!(db.not_unique_hashes().unwrap(), vec!["h1".to_string()]);
}

#[test]
fn test_files_by_hash_keeps_insertion_order() {
    let mut db = EmbeddedEngine::open_in_memory().unwrap();
    db.write_file_info("/z/last-alphabetically", "h", 3).unwrap();
    db.write_file_info("/a/first-alphabetically", "h", 3).unwrap();
    db.write_file_info("/m/middle", "h", 3).unwrap();
    db.write_file_info("/other", "x", 9).unwrap();

    let files = db.files_by_hash("h").unwrap();
    assert_eq!(
        files,
        vec![
            ("/z/last-alphabetically".to_string(), 3),
            ("/a/first-alphabetically".to_string(), 3),
            ("/m/middle".to_string(), 3),
        ]
    );
    assert!(db.files_by_hash("missing").unwrap().is_empty());
}

#[test]
fn test_duplicate_path_is_uniqueness_violation() {
    let mut db = EmbeddedEngine::open_in_memory().unwrap();
    db.write_file_info("/dup.txt", "h", 1).unwrap();

    match db.write_file_info("/dup.txt", "other", 2) {
        Err(Error::UniquenessViolation { path }) => assert_eq!(path, "/dup.txt"),
        other => panic!("expected uniqueness violation, got {:?}", other),
    }
    assert_eq!(db.file_count().unwrap(), 1);
}

#[test]
fn test_hash_with_quote_is_bound_not_interpolated() {
    let mut db = EmbeddedEngine::open_in_memory().unwrap();
    db.write_file_info("/a", "it's", 1).unwrap();
    db.write_file_info("/b", "it's", 1).unwrap();

    assert_eq!(db.files_by_hash("it's").unwrap().len(), 2);
}

#[test]
fn test_group_records_round_trip() {
    let mut db = EmbeddedEngine::open_in_memory().unwrap();
    db.write_group_record("h", "/a", 10).unwrap();
    db.write_group_record("h", "/b", 10).unwrap();

    let records = db.group_records().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].group_key, "h");
    assert_eq!(records[1].path, "/b");
    assert_eq!(records[1].size, 10);
}

#[test]
fn test_operations_before_open_fail_not_opened() {
    let mut db = EmbeddedEngine::new();
    assert!(matches!(db.files_by_hash("h"), Err(Error::NotOpened)));
    assert!(matches!(db.not_unique_hashes(), Err(Error::NotOpened)));
    assert!(matches!(db.write_file_info("/a", "h", 1), Err(Error::NotOpened)));
    assert!(matches!(db.write_group_record("h", "/a", 1), Err(Error::NotOpened)));
    assert!(matches!(db.check_open(), Err(Error::NotOpened)));
}

#[test]
fn test_close_then_reopen_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.sqlite");
    let locator = StorageLocator::Embedded(path.to_string_lossy().into_owned());

    let mut db = EmbeddedEngine::new();
    db.open(&locator).unwrap();
    db.write_file_info("/kept.txt", "h", 4).unwrap();
    db.close();
    assert!(matches!(db.files_by_hash("h"), Err(Error::NotOpened)));

    // Schema creation must tolerate the tables already existing.
    db.open(&locator).unwrap();
    assert_eq!(db.files_by_hash("h").unwrap().len(), 1);
    assert!(matches!(
        db.write_file_info("/kept.txt", "h", 4),
        Err(Error::UniquenessViolation { .. })
    ));
}

#[test]
fn test_invalid_locators() {
    let mut db = EmbeddedEngine::new();
    assert!(matches!(
        db.open(&StorageLocator::Embedded("  ".to_string())),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        db.open(&StorageLocator::Distributed(Default::default())),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(db.check_open(), Err(Error::NotOpened)));
}

#[test]
fn test_tables_are_inspectable() {
    let mut db = EmbeddedEngine::open_in_memory().unwrap();
    db.write_file_info("/a", "h", 1).unwrap();

    let (path, hash, size): (String, String, i64) = db
        .connection()
        .unwrap()
        .query_row("SELECT path, hash, size FROM files", [], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .unwrap();
    assert_eq!((path.as_str(), hash.as_str(), size), ("/a", "h", 1));

    let results: i64 = db
        .connection()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM result", [], |row| row.get(0))
        .unwrap();
    assert_eq!(results, 0);
}
