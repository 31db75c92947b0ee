use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub full_content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub link: String,
    pub source: String,
    pub domain: Option<String>,
    pub categories: Vec<String>,
    pub reading_time_minutes: u32,
    pub fetched_at: DateTime<Utc>,
}

impl Article {
    /// Text handed to the embedding provider.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

/// One entry of the vector record store.
///
/// Records are shared behind `Arc` and never mutated in place: an update
/// swaps the whole record, so a reader holding one sees a consistent value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub article: Article,
    pub embedding: Option<Vec<f32>>,
}

impl VectorRecord {
    pub fn id(&self) -> &str {
        &self.article.id
    }

    pub fn is_embedded(&self) -> bool {
        self.embedding.is_some()
    }
}

/// Point-in-time view of the store returned by `VectorStore::all`.
///
/// Cheap to clone and can be iterated any number of times; mutations made
/// after it was taken never show up in it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    records: Arc<[Arc<VectorRecord>]>,
    revision: u64,
}

impl Snapshot {
    pub fn new(mut records: Vec<Arc<VectorRecord>>, revision: u64) -> Self {
        records.sort_by(|a, b| a.id().cmp(b.id()));
        Self {
            records: records.into(),
            revision,
        }
    }

    /// Records ordered by article id.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<VectorRecord>> + '_ {
        self.records.iter()
    }

    /// Only the records that carry an embedding, with the embedding unwrapped.
    pub fn embedded(&self) -> impl Iterator<Item = (&Arc<VectorRecord>, &[f32])> + '_ {
        self.records
            .iter()
            .filter_map(|r| r.embedding.as_deref().map(|v| (r, v)))
    }

    pub fn embedded_count(&self) -> usize {
        self.embedded().count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredArticle {
    pub article: Article,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicCluster {
    pub id: u32,
    pub name: String,
    pub summary: Option<String>,
    pub label_source: LabelSource,
    pub article_ids: Vec<String>,
}

impl TopicCluster {
    pub fn len(&self) -> usize {
        self.article_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.article_ids.is_empty()
    }
}

/// Result of one clustering run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clustering {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Store revision the run was computed from.
    pub revision: u64,
    pub clusters: BTreeMap<u32, TopicCluster>,
    /// Member articles as they were in the snapshot the run was computed from.
    #[serde(skip)]
    pub members: BTreeMap<String, Article>,
}

impl Clustering {
    pub fn empty(revision: u64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            revision,
            clusters: BTreeMap::new(),
            members: BTreeMap::new(),
        }
    }

    pub fn member(&self, id: &str) -> Option<&Article> {
        self.members.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn article_count(&self) -> usize {
        self.clusters.values().map(TopicCluster::len).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendEntry {
    pub cluster_id: u32,
    pub name: String,
    pub size: usize,
    /// Fraction of the clustered corpus that falls in this cluster.
    pub share: f32,
    pub top_categories: Vec<String>,
    pub average_published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub digest: Vec<TrendEntry>,
    pub narrative: Option<String>,
    pub narrative_failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleAnalysis {
    pub article_id: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub key_takeaways: Vec<String>,
    pub sentiment: Sentiment,
}

/// A single request to a text-generation provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.3,
            max_tokens: 1000,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Option<Vec<f32>>) -> Arc<VectorRecord> {
        Arc::new(VectorRecord {
            article: Article {
                id: id.to_string(),
                title: format!("Title {id}"),
                content: "Body".to_string(),
                summary: None,
                full_content: None,
                published_at: None,
                link: String::new(),
                source: "test".to_string(),
                domain: None,
                categories: vec![],
                reading_time_minutes: 1,
                fetched_at: Utc::now(),
            },
            embedding,
        })
    }

    #[test]
    fn test_snapshot_orders_by_id_and_restarts() {
        let snapshot = Snapshot::new(
            vec![record("b", Some(vec![1.0])), record("a", None), record("c", Some(vec![0.5]))],
            7,
        );
        let first: Vec<_> = snapshot.iter().map(|r| r.id().to_string()).collect();
        let second: Vec<_> = snapshot.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(first, second);
        assert_eq!(snapshot.embedded_count(), 2);
        assert_eq!(snapshot.revision(), 7);
    }

    #[test]
    fn test_embedding_text() {
        let r = record("x", None);
        assert_eq!(r.article.embedding_text(), "Title x Body");
    }
}
