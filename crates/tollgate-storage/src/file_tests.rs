use super::*;
use crate::kv::ScopedKvStore;

fn store_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("state").join("tollgate.json")
}

#[tokio::test]
async fn test_open_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKvStore::open(store_path(&dir)).await.unwrap();
    assert!(store.list_keys("settings").await.unwrap().is_empty());
    // Nothing is written until the first mutation.
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_set_get_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKvStore::open(store_path(&dir)).await.unwrap();

    store.set("settings", "autonomyMode", b"\"safe\"".to_vec()).await.unwrap();
    assert_eq!(
        store.get("settings", "autonomyMode").await.unwrap(),
        Some(b"\"safe\"".to_vec())
    );
    assert!(store.exists("settings", "autonomyMode").await.unwrap());

    assert!(store.delete("settings", "autonomyMode").await.unwrap());
    assert!(!store.delete("settings", "autonomyMode").await.unwrap());
    assert!(store.get("settings", "autonomyMode").await.unwrap().is_none());
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);

    {
        let store = FileKvStore::open(&path).await.unwrap();
        store.set("settings", "a", vec![0, 1, 2, 255]).await.unwrap();
        store.set("ledger", "b", b"plan".to_vec()).await.unwrap();
    }

    let store = FileKvStore::open(&path).await.unwrap();
    assert_eq!(
        store.get("settings", "a").await.unwrap(),
        Some(vec![0, 1, 2, 255])
    );
    assert_eq!(store.get("ledger", "b").await.unwrap(), Some(b"plan".to_vec()));
}

#[tokio::test]
async fn test_second_open_is_locked() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);

    let first = FileKvStore::open(&path).await.unwrap();
    let second = FileKvStore::open(&path).await;
    assert!(matches!(second, Err(StorageError::Locked(_))));

    drop(first);
    assert!(FileKvStore::open(&path).await.is_ok());
}

#[tokio::test]
async fn test_corrupt_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, b"{ not json").unwrap();

    let result = FileKvStore::open(&path).await;
    assert!(matches!(result, Err(StorageError::Serialization(_))));
}

#[tokio::test]
async fn test_clear_namespace_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);

    {
        let store = FileKvStore::open(&path).await.unwrap();
        store.set("ledger", "x", b"1".to_vec()).await.unwrap();
        store.set("ledger", "y", b"2".to_vec()).await.unwrap();
        store.set("settings", "z", b"3".to_vec()).await.unwrap();
        assert_eq!(store.clear_namespace("ledger").await.unwrap(), 2);
        assert_eq!(store.clear_namespace("ledger").await.unwrap(), 0);
    }

    let store = FileKvStore::open(&path).await.unwrap();
    assert!(store.list_keys("ledger").await.unwrap().is_empty());
    assert_eq!(store.list_keys("settings").await.unwrap(), vec!["z"]);
}

#[tokio::test]
async fn test_scoped_json_over_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = store_path(&dir);

    {
        let store = open_shared(&path).await.unwrap();
        let settings = ScopedKvStore::new(store, "settings").unwrap();
        settings
            .set_json("autonomyOverrides", &vec!["EXFIL"])
            .await
            .unwrap();
    }

    let store = open_shared(&path).await.unwrap();
    let settings = ScopedKvStore::new(store, "settings").unwrap();
    let loaded: Vec<String> = settings
        .get_json("autonomyOverrides")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, vec!["EXFIL".to_string()]);
}

#[test]
fn test_lock_path_is_sibling() {
    let path = Path::new("/tmp/state/tollgate.json");
    assert_eq!(lock_path(path), PathBuf::from("/tmp/state/tollgate.json.lock"));
}
