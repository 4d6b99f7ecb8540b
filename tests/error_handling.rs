//! Error handling and edge case tests.

use pague_direto::{CollectionSpec, Store, StoreConfig, StoreError};
use serde_json::{json, Map, Value};
use std::fs;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> StoreConfig {
    StoreConfig {
        path: dir.path().join("pagueDB.json"),
        collections: vec![CollectionSpec::debitos()],
        create_if_missing: true,
    }
}

fn fields(value: Value) -> Map<String, Value> {
    serde_json::from_value(value).unwrap()
}

// --- Missing Records ---

#[test]
fn test_find_missing_record() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();

    // Should return None, not error
    assert!(store.find_by_id("debitos", "nonexistent").is_none());
}

#[test]
fn test_update_missing_record() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();

    let result = store
        .update_by_id("debitos", "nonexistent", fields(json!({"cobranca_valor": 1})))
        .unwrap();

    assert!(result.is_none());
    assert!(store.list("debitos").is_empty());
}

#[test]
fn test_delete_twice() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();

    let r = store.create_record("debitos", Map::new()).unwrap();
    let id = r.id("debito_id").unwrap().to_string();

    assert!(store.delete_by_id("debitos", &id).is_ok());
    assert!(store.delete_by_id("debitos", &id).is_ok());
}

#[test]
fn test_empty_period() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();
    store.create_record("debitos", Map::new()).unwrap();

    assert!(store
        .filter_by_date_range("debitos", "2023-01-01", "2023-01-31")
        .is_empty());
}

#[test]
fn test_inverted_period_matches_nothing() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();
    store.create_record("debitos", Map::new()).unwrap();

    assert!(store
        .filter_by_date_range("debitos", "9999-12-31", "0000-01-01")
        .is_empty());
}

#[test]
fn test_records_without_date_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pagueDB.json");
    fs::write(
        &path,
        r#"{"debitos": [
            {"debito_id": "a", "created_at": "2023-01-10"},
            {"debito_id": "b"},
            {"debito_id": "c", "created_at": 20230110}
        ]}"#,
    )
    .unwrap();

    let store = Store::open(StoreConfig {
        path,
        ..test_config(&dir)
    })
    .unwrap();

    let hits = store.filter_by_date_range("debitos", "2023-01-01", "2023-01-31");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id("debito_id"), Some("a"));
}

// --- Unconfigured Collections ---

#[test]
fn test_writes_to_unknown_collection() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();

    assert!(matches!(
        store.create_record("cliente", Map::new()),
        Err(StoreError::CollectionNotFound(name)) if name == "cliente"
    ));
    assert!(matches!(
        store.update_by_id("cliente", "x", Map::new()),
        Err(StoreError::CollectionNotFound(_))
    ));
    assert!(matches!(
        store.delete_by_id("cliente", "x"),
        Err(StoreError::CollectionNotFound(_))
    ));
    assert!(store.list("cliente").is_empty());
}

// --- File Errors ---

#[test]
fn test_corrupt_document() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    fs::write(&config.path, "{ not json").unwrap();

    assert!(matches!(
        Store::open(config),
        Err(StoreError::InvalidFormat(_))
    ));
}

#[test]
fn test_missing_document_without_create() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        create_if_missing: false,
        ..test_config(&dir)
    };

    assert!(matches!(
        Store::open_or_create(config),
        Err(StoreError::NotInitialized(_))
    ));
}

#[test]
fn test_second_process_is_locked_out() {
    let dir = TempDir::new().unwrap();
    let _store = Store::create(test_config(&dir)).unwrap();

    assert!(matches!(
        Store::open_or_create(test_config(&dir)),
        Err(StoreError::Locked)
    ));
}

#[test]
fn test_lock_released_on_drop() {
    let dir = TempDir::new().unwrap();
    drop(Store::create(test_config(&dir)).unwrap());

    assert!(Store::open(test_config(&dir)).is_ok());
}

#[test]
fn test_failed_rename_leaves_memory_untouched() {
    let dir = TempDir::new().unwrap();
    let store = Store::create(test_config(&dir)).unwrap();
    let created = store
        .create_record("debitos", fields(json!({"usuario_nome": "A"})))
        .unwrap();
    let id = created.id("debito_id").unwrap().to_string();

    fs::remove_file(store.path()).unwrap();
    fs::create_dir(store.path()).unwrap();
    fs::write(store.path().join("occupied"), b"x").unwrap();

    assert!(matches!(
        store.create_record("debitos", Map::new()),
        Err(StoreError::Io(_))
    ));
    assert!(matches!(
        store.update_by_id("debitos", &id, fields(json!({"usuario_nome": "B"}))),
        Err(StoreError::Io(_))
    ));
    assert!(store.delete_by_id("debitos", &id).is_err());

    assert_eq!(store.list("debitos"), vec![created]);
}

#[cfg(unix)]
#[test]
fn test_failed_write_leaves_memory_untouched() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let db_dir = dir.path().join("db");
    let config = StoreConfig {
        path: db_dir.join("pagueDB.json"),
        ..test_config(&dir)
    };
    let store = Store::create(config).unwrap();
    store.create_record("debitos", Map::new()).unwrap();

    // No new temp file can be created in a read-only directory.
    fs::set_permissions(&db_dir, fs::Permissions::from_mode(0o555)).unwrap();
    let probe = db_dir.join("probe");
    let writable = fs::write(&probe, b"").is_ok();
    let _ = fs::remove_file(&probe);

    let result = store.create_record("debitos", Map::new());
    fs::set_permissions(&db_dir, fs::Permissions::from_mode(0o755)).unwrap();

    if writable {
        // Running as root: permissions are not enforced, nothing to check.
        return;
    }
    assert!(matches!(result, Err(StoreError::Io(_))));
    assert_eq!(store.list("debitos").len(), 1);
}
