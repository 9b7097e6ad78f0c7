//! History file tests
//!
//! These tests verify that saved histories survive a reopen and that
//! damaged files are reported:
//! - CRC32 detects bit flips
//! - Short files fail as truncated
//! - Files from a newer format version refuse to open
//! - Missing content blobs decode as unavailable

use localvcs_core::{Content, ContentStore, Error, IdPath};
use localvcs_durability::history::{FORMAT_VERSION, HISTORY_MAGIC};
use localvcs_durability::{
    ChangeFileContent, ChangeList, ChangeSet, CreateDirectory, CreateFile, DurabilityMode, Entry,
    HistoryConfig, HistoryStorage,
};
use tempfile::TempDir;

fn build_history(storage: &HistoryStorage) -> (Entry, ChangeList) {
    let v1 = Content::store(storage.contents(), b"version 1").unwrap();
    let v2 = Content::store(storage.contents(), b"version 2").unwrap();

    let mut root = Entry::root(vec![]);
    let mut changes = ChangeList::new();
    changes
        .commit(
            &mut root,
            ChangeSet::new(Some("init".into()), Some(100))
                .with_change(CreateDirectory {
                    path: IdPath::new(vec![1]),
                    name: "src".into(),
                })
                .with_change(CreateFile {
                    path: IdPath::new(vec![1, 2]),
                    name: "lib.rs".into(),
                    content: Some(v1),
                    timestamp: Some(100),
                }),
        )
        .unwrap();
    changes
        .commit(
            &mut root,
            ChangeSet::new(Some("edit".into()), Some(200)).with_change(ChangeFileContent {
                path: IdPath::new(vec![1, 2]),
                new_content: Some(v2),
                timestamp: Some(200),
            }),
        )
        .unwrap();
    (root, changes)
}

#[test]
fn test_history_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let (root, changes) = {
        let storage = HistoryStorage::open(temp_dir.path(), HistoryConfig::strict()).unwrap();
        let (root, changes) = build_history(&storage);
        storage.save(&root, &changes).unwrap();
        (root, changes)
    };

    let storage = HistoryStorage::open(temp_dir.path(), HistoryConfig::strict()).unwrap();
    let history = storage.load().unwrap().unwrap();
    assert_eq!(history.root, root);
    assert_eq!(history.changes, changes);

    let file = history.root.find(&IdPath::new(vec![1, 2])).unwrap();
    assert_eq!(file.content().unwrap().bytes(), Some(&b"version 2"[..]));
}

#[test]
fn test_file_starts_with_magic_and_version() {
    let temp_dir = TempDir::new().unwrap();
    let storage = HistoryStorage::open(temp_dir.path(), HistoryConfig::for_testing()).unwrap();
    let info = storage.save(&Entry::default(), &ChangeList::new()).unwrap();

    let bytes = std::fs::read(&info.path).unwrap();
    assert_eq!(&bytes[0..4], &HISTORY_MAGIC);
    assert_eq!(&bytes[4..8], &FORMAT_VERSION.to_be_bytes());
    assert_eq!(&bytes[8..24], storage.history_id().as_bytes());
}

#[test]
fn test_crc_detects_bit_flip() {
    let temp_dir = TempDir::new().unwrap();
    let storage = HistoryStorage::open(temp_dir.path(), HistoryConfig::for_testing()).unwrap();
    let (root, changes) = build_history(&storage);
    let info = storage.save(&root, &changes).unwrap();

    let mut bytes = std::fs::read(&info.path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    std::fs::write(&info.path, &bytes).unwrap();

    assert!(matches!(storage.load(), Err(Error::Corruption(_))));
}

#[test]
fn test_truncated_file() {
    let temp_dir = TempDir::new().unwrap();
    let storage = HistoryStorage::open(temp_dir.path(), HistoryConfig::for_testing()).unwrap();
    let (root, changes) = build_history(&storage);
    let info = storage.save(&root, &changes).unwrap();

    let bytes = std::fs::read(&info.path).unwrap();
    for len in [0, 3, 20, bytes.len() / 2, bytes.len() - 1] {
        std::fs::write(&info.path, &bytes[..len]).unwrap();
        let err = storage.load().unwrap_err();
        assert!(err.is_truncated(), "len {}: {}", len, err);
    }
}

#[test]
fn test_unsupported_version() {
    let temp_dir = TempDir::new().unwrap();
    let storage = HistoryStorage::open(temp_dir.path(), HistoryConfig::for_testing()).unwrap();
    let info = storage.save(&Entry::default(), &ChangeList::new()).unwrap();

    let mut bytes = std::fs::read(&info.path).unwrap();
    bytes[4..8].copy_from_slice(&(FORMAT_VERSION + 1).to_be_bytes());
    std::fs::write(&info.path, &bytes).unwrap();

    assert!(matches!(
        storage.load(),
        Err(Error::UnsupportedVersion { .. })
    ));
}

#[test]
fn test_reopen_newer_version_fails() {
    let temp_dir = TempDir::new().unwrap();
    let info = {
        let storage = HistoryStorage::open(temp_dir.path(), HistoryConfig::for_testing()).unwrap();
        let (root, changes) = build_history(&storage);
        storage.save(&root, &changes).unwrap()
    };

    let mut bytes = std::fs::read(&info.path).unwrap();
    bytes[4..8].copy_from_slice(&(FORMAT_VERSION + 1).to_be_bytes());
    std::fs::write(&info.path, &bytes).unwrap();

    let result = HistoryStorage::open(temp_dir.path(), HistoryConfig::for_testing());
    match result {
        Err(Error::UnsupportedVersion { found, supported }) => {
            assert_eq!(found, FORMAT_VERSION + 1);
            assert_eq!(supported, FORMAT_VERSION);
        }
        Err(e) => panic!("Expected UnsupportedVersion, got {}", e),
        Ok(_) => panic!("Expected UnsupportedVersion, got an open storage"),
    }
    assert_eq!(std::fs::read(&info.path).unwrap(), bytes);
}

#[test]
fn test_missing_blob_is_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let storage = HistoryStorage::open(
        temp_dir.path(),
        HistoryConfig::default().with_durability(DurabilityMode::Relaxed),
    )
    .unwrap();
    let (root, changes) = build_history(&storage);
    storage.save(&root, &changes).unwrap();

    let current = root.find(&IdPath::new(vec![1, 2])).unwrap().content().unwrap();
    std::fs::remove_file(storage.contents().dir().join(current.id().to_string())).unwrap();
    assert!(!storage.contents().contains(current.id()).unwrap());

    let history = storage.load().unwrap().unwrap();
    let loaded = history.root.find(&IdPath::new(vec![1, 2])).unwrap();
    assert!(!loaded.content().unwrap().is_available());
    assert_eq!(history.changes.len(), 2);
}

#[test]
fn test_second_save_replaces_first() {
    let temp_dir = TempDir::new().unwrap();
    let storage = HistoryStorage::open(temp_dir.path(), HistoryConfig::for_testing()).unwrap();
    let (root, changes) = build_history(&storage);

    storage.save(&Entry::default(), &ChangeList::new()).unwrap();
    storage.save(&root, &changes).unwrap();

    let history = storage.load().unwrap().unwrap();
    assert_eq!(history.changes.len(), 2);
    assert_eq!(storage.cleanup_temp_files().unwrap(), 0);
}
