use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::tempdir;

use dry_core::grouper::group_records;
use dry_core::storage::{EmbeddedEngine, Index, Storage};
use dry_core::{hasher, AppConfig, DryEngine, Error, ProgressReporter, SilentReporter};

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Layout:
///   root/
///     a.txt  ("hello")
///     b.txt  ("hello")   ← duplicate of a.txt
///     c.txt  ("world")
fn create_hello_tree(root: &Path) {
    fs::create_dir_all(root).unwrap();
    fs::write(root.join("a.txt"), "hello").unwrap();
    fs::write(root.join("b.txt"), "hello").unwrap();
    fs::write(root.join("c.txt"), "world").unwrap();
}

#[derive(Default)]
struct RecordingReporter {
    group_messages: Mutex<Vec<String>>,
}

impl ProgressReporter for RecordingReporter {
    fn on_group_progress(&self, message: &str) {
        self.group_messages.lock().unwrap().push(message.to_string());
    }
}

#[test]
fn test_equal_content_hashes_equal() {
    let tmp = tempdir().unwrap();
    create_hello_tree(tmp.path());

    let (a, _) = hasher::hash_file(&tmp.path().join("a.txt"), None).unwrap();
    let (b, _) = hasher::hash_file(&tmp.path().join("b.txt"), None).unwrap();
    let (c, _) = hasher::hash_file(&tmp.path().join("c.txt"), None).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_embedded_scan_finds_hello_group() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_hello_tree(&root);

    let db_dir = tempdir().unwrap();
    let db_path = db_dir.path().join("report.sqlite");
    let config = AppConfig {
        sqlite_path: path_str(&db_path),
        ..AppConfig::default()
    };

    let reporter = RecordingReporter::default();
    let result = DryEngine::new(config).scan(&root, &reporter).unwrap();

    assert_eq!(result.index.stats.files_indexed, 3);
    assert_eq!(result.index.prescan_total, Some(3));
    assert_eq!(result.group.groups.len(), 1);

    let group = &result.group.groups[0];
    assert_eq!(group.member_count(), 2);
    assert_eq!(group.representative_size, 5);
    assert_eq!(group.total_size, 10);
    let mut members = group.member_paths.clone();
    members.sort();
    assert_eq!(
        members,
        vec![path_str(&root.join("a.txt")), path_str(&root.join("b.txt"))]
    );
    assert_eq!(result.group.duplicate_files(), 2);
    assert_eq!(result.group.wasted_bytes(), 5);

    let messages = reporter.group_messages.into_inner().unwrap();
    assert_eq!(messages, vec![format!("[1 of 1] {}", group.hash)]);

    // The report file holds both tables for direct inspection.
    let mut db = EmbeddedEngine::new();
    db.open_path(&path_str(&db_path)).unwrap();
    assert_eq!(db.file_count().unwrap(), 3);
    let records = db.group_records().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.group_key == group.hash));
    let c_path = path_str(&root.join("c.txt"));
    assert!(records.iter().all(|r| r.path != c_path));
}

#[test]
fn test_grouping_persists_only_confirmed_members() {
    let tmp = tempdir().unwrap();
    let a = tmp.path().join("a");
    let b = tmp.path().join("b");
    let c = tmp.path().join("c");
    fs::write(&a, "x").unwrap();
    fs::write(&b, "x").unwrap();
    fs::write(&c, "y").unwrap();

    let mut db = EmbeddedEngine::open_in_memory().unwrap();
    db.write_file_info(&path_str(&a), "hash-x", 1).unwrap();
    db.write_file_info(&path_str(&b), "hash-x", 1).unwrap();
    db.write_file_info(&path_str(&c), "hash-y", 1).unwrap();

    let groups = group_records(&mut db, &SilentReporter).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].hash, "hash-x");
    assert_eq!(groups[0].member_paths, vec![path_str(&a), path_str(&b)]);
    assert!(db
        .group_records()
        .unwrap()
        .iter()
        .all(|r| r.group_key == "hash-x"));
}

#[test]
fn test_hash_collision_is_caught_by_comparison() {
    let tmp = tempdir().unwrap();
    let original = tmp.path().join("original");
    let impostor = tmp.path().join("impostor");
    let twin = tmp.path().join("twin");
    fs::write(&original, "same size A").unwrap();
    fs::write(&impostor, "same size B").unwrap();
    fs::write(&twin, "same size A").unwrap();

    // Pretend all three share one digest.
    let mut db = EmbeddedEngine::open_in_memory().unwrap();
    db.write_file_info(&path_str(&original), "collide", 11).unwrap();
    db.write_file_info(&path_str(&impostor), "collide", 11).unwrap();
    db.write_file_info(&path_str(&twin), "collide", 11).unwrap();

    let groups = group_records(&mut db, &SilentReporter).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(
        groups[0].member_paths,
        vec![path_str(&original), path_str(&twin)]
    );
    assert_eq!(groups[0].representative_path, path_str(&twin));

    let persisted: Vec<String> = db
        .group_records()
        .unwrap()
        .into_iter()
        .map(|r| r.path)
        .collect();
    assert_eq!(persisted, vec![path_str(&original), path_str(&twin)]);
}

#[test]
fn test_unconfirmed_representative_is_still_recorded() {
    let tmp = tempdir().unwrap();
    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    fs::write(&first, "aaaa").unwrap();
    fs::write(&second, "bbbb").unwrap();

    let mut db = EmbeddedEngine::open_in_memory().unwrap();
    db.write_file_info(&path_str(&first), "collide", 4).unwrap();
    db.write_file_info(&path_str(&second), "collide", 4).unwrap();

    let groups = group_records(&mut db, &SilentReporter).unwrap();
    assert_eq!(groups.len(), 1);
    assert!(!groups[0].is_duplicate());
    assert_eq!(groups[0].representative_path, path_str(&first));
    assert_eq!(db.group_records().unwrap().len(), 1);
}

#[test]
fn test_vanished_member_stops_grouping() {
    let tmp = tempdir().unwrap();
    let kept = tmp.path().join("kept");
    let gone = tmp.path().join("gone");
    fs::write(&kept, "data").unwrap();

    let mut db = EmbeddedEngine::open_in_memory().unwrap();
    db.write_file_info(&path_str(&kept), "h", 4).unwrap();
    db.write_file_info(&path_str(&gone), "h", 4).unwrap();

    let result = group_records(&mut db, &SilentReporter);
    assert!(matches!(result, Err(Error::NotAFile(path)) if path == gone));
}

#[test]
fn test_reindexing_same_tree_is_uniqueness_violation() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("root");
    create_hello_tree(&root);

    let engine = DryEngine::new(AppConfig::default());
    let mut storage = engine.open_storage().unwrap();
    engine.index(&mut storage, &root, &SilentReporter).unwrap();

    let again = engine.index(&mut storage, &root, &SilentReporter);
    assert!(matches!(again, Err(Error::UniquenessViolation { .. })));
}

#[test]
fn test_invalid_root_is_reported_before_indexing() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("never-created.sqlite");
    let config = AppConfig {
        sqlite_path: path_str(&db_path),
        ..AppConfig::default()
    };

    let result = DryEngine::new(config).scan(&tmp.path().join("missing"), &SilentReporter);
    assert!(matches!(result, Err(Error::InvalidRoot(_))));
    assert!(!db_path.exists());
}

#[test]
fn test_nested_duplicates_across_folders() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("folder_a")).unwrap();
    fs::create_dir_all(root.join("folder_b/deeper")).unwrap();
    fs::write(root.join("folder_a/shared.txt"), "shared content xyz").unwrap();
    fs::write(root.join("folder_b/deeper/shared.txt"), "shared content xyz").unwrap();
    fs::write(root.join("folder_b/copy.bin"), vec![0xAAu8; 40_000]).unwrap();
    fs::write(root.join("folder_a/copy.bin"), vec![0xAAu8; 40_000]).unwrap();
    fs::write(root.join("folder_a/unique.txt"), "unique").unwrap();

    let engine = DryEngine::new(AppConfig {
        prescan: false,
        ..AppConfig::default()
    });
    let mut storage = Storage::open(
        &engine.config().storage_locator().unwrap(),
        None,
        Default::default(),
    )
    .unwrap();
    let result = engine.scan_into(&mut storage, root, &SilentReporter).unwrap();

    assert_eq!(result.index.prescan_total, None);
    assert_eq!(result.group.groups.len(), 2);
    assert!(result.group.groups.iter().all(|g| g.member_count() == 2));
    assert!(result.group.groups.windows(2).all(|w| w[0].hash < w[1].hash));
    assert_eq!(result.group.wasted_bytes(), 40_000 + 18);
}
