use std::sync::Arc;

use anyhow::Result;
use is_it_safe::blacklist::{
    BlacklistError, BlacklistStore, MemoryBlacklistStore, BLACKLIST_KEY,
};
use is_it_safe::file_store::JsonFileBlacklistStore;
use is_it_safe::validation::MAX_BLACKLIST_TERM_LENGTH;
use tempfile::TempDir;

const OWNER: i64 = 12345;
const OTHER_OWNER: i64 = 67890;

fn file_store(dir: &TempDir) -> JsonFileBlacklistStore {
    JsonFileBlacklistStore::new(dir.path().join("data").join("blacklists.json"))
}

/// Behaviour every backend must share
async fn exercise_store(store: &dyn BlacklistStore) -> Result<()> {
    assert!(store.load(OWNER).await.is_empty());

    let items = store.add(OWNER, "  Milk  ").await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Milk");

    let items = store.add(OWNER, "Peanuts").await?;
    assert_eq!(
        items.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
        ["Milk", "Peanuts"]
    );
    assert_ne!(items[0].id, items[1].id);

    // Duplicates are detected ignoring case and surrounding whitespace
    match store.add(OWNER, " MILK ").await {
        Err(BlacklistError::Duplicate(existing)) => assert_eq!(existing, "Milk"),
        other => panic!("expected duplicate error, got {:?}", other),
    }
    assert!(matches!(
        store.add(OWNER, "   ").await,
        Err(BlacklistError::EmptyName)
    ));
    let too_long = "x".repeat(MAX_BLACKLIST_TERM_LENGTH + 1);
    assert!(matches!(
        store.add(OWNER, &too_long).await,
        Err(BlacklistError::NameTooLong { .. })
    ));
    assert_eq!(store.load(OWNER).await.len(), 2);

    // Other owners are isolated
    assert!(store.load(OTHER_OWNER).await.is_empty());
    store.add(OTHER_OWNER, "Milk").await?;
    assert_eq!(store.load(OTHER_OWNER).await.len(), 1);

    let milk_id = items[0].id.clone();
    let items = store.remove(OWNER, &milk_id).await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Peanuts");

    // Unknown ids leave the list alone
    let items = store.remove(OWNER, "does-not-exist").await?;
    assert_eq!(items.len(), 1);

    store.clear(OWNER).await?;
    assert!(store.load(OWNER).await.is_empty());
    assert_eq!(store.load(OTHER_OWNER).await.len(), 1);

    // Clearing an empty list is fine
    store.clear(OWNER).await?;
    store.health_check().await?;
    Ok(())
}

mod memory_store {
    use super::*;

    #[tokio::test]
    async fn test_store_operations() -> Result<()> {
        let store = MemoryBlacklistStore::new();
        exercise_store(&store).await
    }

    #[tokio::test]
    async fn test_corrupted_value_loads_as_empty() -> Result<()> {
        let store = MemoryBlacklistStore::new();
        store.insert_raw(OWNER, "{not json");
        assert!(store.load(OWNER).await.is_empty());

        // A write over corrupted data is refused rather than silently dropping it
        assert!(matches!(
            store.add(OWNER, "Milk").await,
            Err(BlacklistError::Storage(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_value_is_a_json_array() -> Result<()> {
        let store = MemoryBlacklistStore::new();
        store.add(OWNER, "Soy").await?;

        let raw = store.raw_value(OWNER).expect("value stored");
        let parsed: serde_json::Value = serde_json::from_str(&raw)?;
        let array = parsed.as_array().expect("array");
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["name"], "Soy");
        assert!(array[0]["id"].is_string());
        assert!(array[0]["created_at"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_every_item() -> Result<()> {
        let store = Arc::new(MemoryBlacklistStore::new());
        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add(OWNER, &format!("term {}", i)).await })
            })
            .collect();
        for task in tasks {
            task.await??;
        }
        assert_eq!(store.load(OWNER).await.len(), 20);
        Ok(())
    }
}

mod file_store {
    use super::*;

    #[tokio::test]
    async fn test_store_operations() -> Result<()> {
        let dir = TempDir::new()?;
        let store = file_store(&dir);
        exercise_store(&store).await
    }

    #[tokio::test]
    async fn test_persists_across_instances() -> Result<()> {
        let dir = TempDir::new()?;
        file_store(&dir).add(OWNER, "Gluten").await?;
        file_store(&dir).add(OWNER, "Sesame").await?;

        let reopened = file_store(&dir);
        let names: Vec<_> = reopened
            .load(OWNER)
            .await
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, ["Gluten", "Sesame"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_file_layout() -> Result<()> {
        let dir = TempDir::new()?;
        let store = file_store(&dir);
        store.add(OWNER, "Celery").await?;

        let raw = std::fs::read_to_string(store.path())?;
        let parsed: serde_json::Value = serde_json::from_str(&raw)?;
        let encoded = parsed[OWNER.to_string()][BLACKLIST_KEY]
            .as_str()
            .expect("blacklist stored as an encoded string");
        let items: serde_json::Value = serde_json::from_str(encoded)?;
        assert_eq!(items[0]["name"], "Celery");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_loads_as_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let store = file_store(&dir);
        assert!(store.load(OWNER).await.is_empty());
        store.health_check().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupted_file_loads_as_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("blacklists.json");
        std::fs::write(&path, "this is not json")?;

        let store = JsonFileBlacklistStore::new(&path);
        assert!(store.load(OWNER).await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupted_entry_loads_as_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("blacklists.json");
        let contents = format!(
            r#"{{"{}": {{"{}": "[{{\"broken\": true"}}}}"#,
            OWNER, BLACKLIST_KEY
        );
        std::fs::write(&path, contents)?;

        let store = JsonFileBlacklistStore::new(&path);
        assert!(store.load(OWNER).await.is_empty());
        Ok(())
    }
}
