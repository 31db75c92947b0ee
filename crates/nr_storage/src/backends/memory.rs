use async_trait::async_trait;
use nr_core::config::StorageConfig;
use nr_core::{Article, Error, Result, Snapshot, VectorRecord, VectorStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, Arc<VectorRecord>>,
    dimension: Option<usize>,
    revision: u64,
}

impl MemoryStore {
    pub fn new(dimension: Option<usize>) -> Self {
        Self {
            records: HashMap::new(),
            dimension,
            revision: 0,
        }
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != actual => Err(Error::DimensionMismatch { expected, actual }),
            None if actual == 0 => Err(Error::DimensionMismatch { expected: 1, actual }),
            _ => Ok(()),
        }
    }

    pub fn put(&mut self, id: &str, vector: Vec<f32>, mut article: Article) -> Result<()> {
        self.check_dimension(vector.len())?;
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidVector(id.to_string()));
        }
        if self.dimension.is_none() {
            debug!("Vector dimension established at {}", vector.len());
            self.dimension = Some(vector.len());
        }
        article.id = id.to_string();
        self.records.insert(
            id.to_string(),
            Arc::new(VectorRecord {
                article,
                embedding: Some(vector),
            }),
        );
        self.revision += 1;
        Ok(())
    }

    pub fn put_article(&mut self, article: Article) {
        let embedding = self
            .records
            .get(&article.id)
            .and_then(|existing| existing.embedding.clone());
        self.records
            .insert(article.id.clone(), Arc::new(VectorRecord { article, embedding }));
        self.revision += 1;
    }

    pub fn get(&self, id: &str) -> Result<Arc<VectorRecord>> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.records.values().cloned().collect(), self.revision)
    }

    pub fn delete(&mut self, id: &str) {
        if self.records.remove(id).is_some() {
            self.revision += 1;
        }
    }

    pub fn set_categories(&mut self, id: &str, categories: Vec<String>) -> Result<()> {
        let current = self.get(id)?;
        let mut updated = VectorRecord::clone(&current);
        updated.article.categories = categories;
        self.records.insert(id.to_string(), Arc::new(updated));
        self.revision += 1;
        Ok(())
    }
}

/// On-disk layout of a store snapshot.
#[derive(Serialize, Deserialize)]
struct PersistedStore {
    dimension: Option<usize>,
    records: Vec<VectorRecord>,
}

pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
    config: StorageConfig,
}

impl MemoryStorage {
    pub fn new(config: StorageConfig) -> Self {
        let store = Arc::new(RwLock::new(MemoryStore::new(config.dimension)));
        Self { store, config }
    }

    /// Build a store, loading the snapshot file named in `config` when it exists.
    pub async fn open(config: StorageConfig) -> Result<Self> {
        let storage = Self::new(config);
        if let Some(path) = storage.config.snapshot_path.clone() {
            if tokio::fs::try_exists(&path).await? {
                storage.load(&path).await?;
            }
        }
        Ok(storage)
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.config.snapshot_path.as_deref()
    }

    async fn load(&self, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let persisted: PersistedStore = serde_json::from_slice(&bytes)?;

        let mut store = self.store.write().await;
        if let (Some(configured), Some(saved)) = (self.config.dimension, persisted.dimension) {
            if configured != saved {
                return Err(Error::DimensionMismatch {
                    expected: configured,
                    actual: saved,
                });
            }
        }
        if store.dimension.is_none() {
            store.dimension = persisted.dimension;
        }

        let count = persisted.records.len();
        for record in persisted.records {
            match record.embedding {
                Some(vector) => {
                    let id = record.article.id.clone();
                    store.put(&id, vector, record.article)?;
                }
                None => store.put_article(record.article),
            }
        }
        info!("📂 Loaded {} records from {}", count, path.display());
        Ok(())
    }

    /// Write the current contents to the snapshot file, if one is configured.
    ///
    /// The file is replaced atomically via a temporary sibling and a rename.
    pub async fn flush(&self) -> Result<()> {
        let Some(path) = self.config.snapshot_path.clone() else {
            return Ok(());
        };
        let persisted = {
            let store = self.store.read().await;
            let snapshot = store.snapshot();
            PersistedStore {
                dimension: store.dimension,
                records: snapshot.iter().map(|r| VectorRecord::clone(r)).collect(),
            }
        };
        let json = serde_json::to_vec(&persisted)?;
        let tmp = temp_path(&path);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        info!("💾 Saved {} records to {}", persisted.records.len(), path.display());
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl VectorStore for MemoryStorage {
    async fn put(&self, id: &str, vector: Vec<f32>, article: Article) -> Result<()> {
        let mut store = self.store.write().await;
        store.put(id, vector, article)
    }

    async fn put_article(&self, article: Article) -> Result<()> {
        let mut store = self.store.write().await;
        store.put_article(article);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Arc<VectorRecord>> {
        let store = self.store.read().await;
        store.get(id)
    }

    async fn all(&self) -> Result<Snapshot> {
        let store = self.store.read().await;
        Ok(store.snapshot())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut store = self.store.write().await;
        store.delete(id);
        Ok(())
    }

    async fn set_categories(&self, id: &str, categories: Vec<String>) -> Result<()> {
        let mut store = self.store.write().await;
        store.set_categories(id, categories)
    }

    async fn revision(&self) -> u64 {
        self.store.read().await.revision
    }

    async fn dimension(&self) -> Option<usize> {
        self.store.read().await.dimension
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn article(id: &str) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Article {id}"),
            content: "This is a test article about technology.".to_string(),
            summary: None,
            full_content: None,
            published_at: Some(Utc::now()),
            link: format!("http://test.com/{id}"),
            source: "http://test.com/rss".to_string(),
            domain: Some("test.com".to_string()),
            categories: vec!["Tech".to_string()],
            reading_time_minutes: 1,
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let storage = MemoryStorage::new(StorageConfig::default());
        let vector = vec![0.25, -1.5, 3.0];
        storage.put("a", vector.clone(), article("a")).await.unwrap();

        let record = storage.get("a").await.unwrap();
        assert_eq!(record.embedding.as_deref(), Some(vector.as_slice()));
        assert_eq!(record.article.title, "Article a");
        assert_eq!(storage.dimension().await, Some(3));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_vector() {
        let storage = MemoryStorage::new(StorageConfig::default());
        storage.put("a", vec![1.0, 0.0], article("a")).await.unwrap();
        storage.put("a", vec![0.0, 1.0], article("a")).await.unwrap();
        let record = storage.get("a").await.unwrap();
        assert_eq!(record.embedding, Some(vec![0.0, 1.0]));
        assert_eq!(storage.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let storage = MemoryStorage::new(StorageConfig::default());
        storage.put("a", vec![1.0, 0.0], article("a")).await.unwrap();
        let err = storage.put("b", vec![1.0, 0.0, 0.0], article("b")).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
        assert!(matches!(storage.get("b").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_configured_dimension() {
        let storage = MemoryStorage::new(StorageConfig {
            dimension: Some(4),
            snapshot_path: None,
        });
        let err = storage.put("a", vec![1.0, 0.0], article("a")).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 2 }));
    }

    #[tokio::test]
    async fn test_empty_vector_rejected() {
        let storage = MemoryStorage::new(StorageConfig::default());
        assert!(storage.put("a", vec![], article("a")).await.is_err());
        assert_eq!(storage.dimension().await, None);
    }

    #[tokio::test]
    async fn test_non_finite_vector_rejected() {
        let storage = MemoryStorage::new(StorageConfig::default());
        storage.put("a", vec![1.0, 0.0], article("a")).await.unwrap();
        let err = storage.put("n", vec![f32::NAN, 0.0], article("n")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidVector(_)));
        let err = storage
            .put("i", vec![f32::INFINITY, 0.0], article("i"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidVector(_)));
        assert!(matches!(storage.get("n").await, Err(Error::NotFound(_))));
        assert_eq!(storage.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_and_delete() {
        let storage = MemoryStorage::new(StorageConfig::default());
        assert!(matches!(storage.get("nope").await, Err(Error::NotFound(_))));
        storage.delete("nope").await.unwrap();
        assert_eq!(storage.revision().await, 0);

        storage.put("a", vec![1.0], article("a")).await.unwrap();
        storage.delete("a").await.unwrap();
        assert!(matches!(storage.get("a").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_put_article_keeps_embedding() {
        let storage = MemoryStorage::new(StorageConfig::default());
        storage.put_article(article("plain")).await.unwrap();
        assert!(!storage.get("plain").await.unwrap().is_embedded());

        storage.put("a", vec![1.0, 2.0], article("a")).await.unwrap();
        let mut updated = article("a");
        updated.title = "Updated".to_string();
        storage.put_article(updated).await.unwrap();

        let record = storage.get("a").await.unwrap();
        assert_eq!(record.article.title, "Updated");
        assert_eq!(record.embedding, Some(vec![1.0, 2.0]));
    }

    #[tokio::test]
    async fn test_snapshot_is_isolated_from_later_writes() {
        let storage = MemoryStorage::new(StorageConfig::default());
        storage.put("a", vec![1.0], article("a")).await.unwrap();
        let snapshot = storage.all().await.unwrap();

        storage.put("b", vec![2.0], article("b")).await.unwrap();
        storage.put("a", vec![3.0], article("a")).await.unwrap();

        let ids: Vec<_> = snapshot.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["a"]);
        assert_eq!(snapshot.iter().next().unwrap().embedding, Some(vec![1.0]));
        assert_eq!(storage.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_set_categories() {
        let storage = MemoryStorage::new(StorageConfig::default());
        storage.put("a", vec![1.0], article("a")).await.unwrap();
        storage
            .set_categories("a", vec!["AI".to_string(), "Policy".to_string()])
            .await
            .unwrap();
        let record = storage.get("a").await.unwrap();
        assert_eq!(record.article.categories, vec!["AI", "Policy"]);
        assert_eq!(record.embedding, Some(vec![1.0]));
        assert!(storage.set_categories("missing", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_puts_same_id() {
        let storage = Arc::new(MemoryStorage::new(StorageConfig::default()));
        let mut handles = Vec::new();
        for i in 0..16 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                let v = i as f32;
                storage.put("shared", vec![v, v], article("shared")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let record = storage.get("shared").await.unwrap();
        let vector = record.embedding.clone().unwrap();
        assert_eq!(vector[0], vector[1]);
    }

    #[tokio::test]
    async fn test_flush_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let config = StorageConfig {
            dimension: None,
            snapshot_path: Some(path.clone()),
        };

        let storage = MemoryStorage::open(config.clone()).await.unwrap();
        storage.put("a", vec![0.5, 0.5], article("a")).await.unwrap();
        storage.put_article(article("b")).await.unwrap();
        storage.flush().await.unwrap();

        let reopened = MemoryStorage::open(config).await.unwrap();
        assert_eq!(reopened.dimension().await, Some(2));
        assert_eq!(reopened.get("a").await.unwrap().embedding, Some(vec![0.5, 0.5]));
        assert!(!reopened.get("b").await.unwrap().is_embedded());
    }
}
