use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use nr_core::config::ClusterConfig;
use nr_core::similarity::{dot, normalize};
use nr_core::{Article, Clustering, LabelSource, Prompt, Result, TextGenerator, TopicCluster, VectorStore};
use nr_inference::reply::extract_json;
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::kmeans::{cluster_count, spherical_kmeans, KMeansParams};

const SYSTEM_PROMPT: &str = "You are a news analyst specializing in topic clustering and summarization.";
const SNIPPET_CHARS: usize = 200;
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "from", "was", "are", "will", "have", "into",
    "about", "after", "over", "their", "says", "what", "your", "more", "than", "just",
];

#[derive(Deserialize)]
struct LabelReply {
    name: String,
    #[serde(default)]
    summary: Option<String>,
}

struct Label {
    name: String,
    summary: Option<String>,
    source: LabelSource,
}

/// Groups embedded articles into named topic clusters.
pub struct ClusterEngine {
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn TextGenerator>,
    config: ClusterConfig,
    last_run: RwLock<Option<Arc<Clustering>>>,
}

impl fmt::Debug for ClusterEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterEngine")
            .field("generator", &self.generator.name())
            .field("config", &self.config)
            .finish()
    }
}

impl ClusterEngine {
    pub fn new(store: Arc<dyn VectorStore>, generator: Arc<dyn TextGenerator>, config: ClusterConfig) -> Self {
        Self {
            store,
            generator,
            config,
            last_run: RwLock::new(None),
        }
    }

    /// Last clustering run, recomputed only when the store changed since.
    pub async fn current(&self) -> Result<Arc<Clustering>> {
        let revision = self.store.revision().await;
        if let Some(run) = self.last_run.read().await.as_ref() {
            if run.revision == revision {
                tracing::debug!(run_id = %run.run_id, revision, "Reusing clustering run");
                return Ok(Arc::clone(run));
            }
        }
        self.cluster().await
    }

    /// Runs a fresh clustering over the current snapshot of the store.
    pub async fn cluster(&self) -> Result<Arc<Clustering>> {
        let snapshot = self.store.all().await?;
        let revision = snapshot.revision();
        let (records, vectors): (Vec<_>, Vec<_>) = snapshot
            .embedded()
            .map(|(record, vector)| (Arc::clone(record), vector.to_vec()))
            .unzip();

        if records.is_empty() {
            tracing::info!("🧩 No embedded articles, nothing to cluster");
            let run = Arc::new(Clustering::empty(revision));
            *self.last_run.write().await = Some(Arc::clone(&run));
            return Ok(run);
        }

        let k = cluster_count(records.len(), self.config.max_clusters, self.config.fixed_clusters);
        tracing::info!("🧩 Clustering {} articles into up to {} topics", records.len(), k);
        let outcome = spherical_kmeans(
            &vectors,
            &KMeansParams {
                k,
                max_iterations: self.config.max_iterations,
                tolerance: self.config.tolerance,
            },
        );

        let groups: Vec<(Vec<usize>, &Vec<f32>)> = outcome
            .groups()
            .into_iter()
            .zip(&outcome.centroids)
            .filter(|(members, _)| !members.is_empty())
            .collect();

        let labels = join_all(groups.iter().enumerate().map(|(cluster_id, (members, centroid))| {
            let representatives = self.representatives(members, centroid, &vectors);
            let representatives: Vec<&Article> = representatives.iter().map(|&i| &records[i].article).collect();
            let members: Vec<&Article> = members.iter().map(|&i| &records[i].article).collect();
            self.label(cluster_id as u32, representatives, members)
        }))
        .await;

        let clusters: BTreeMap<u32, TopicCluster> = groups
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(cluster_id, ((members, _), label))| {
                let id = cluster_id as u32;
                let cluster = TopicCluster {
                    id,
                    name: label.name,
                    summary: label.summary,
                    label_source: label.source,
                    article_ids: members.iter().map(|&i| records[i].id().to_string()).collect(),
                };
                (id, cluster)
            })
            .collect();

        let members: BTreeMap<String, Article> = records
            .iter()
            .map(|r| (r.id().to_string(), r.article.clone()))
            .collect();
        let run = Arc::new(Clustering {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            revision,
            clusters,
            members,
        });
        tracing::info!(
            run_id = %run.run_id,
            iterations = outcome.iterations,
            converged = outcome.converged,
            "✅ Found {} topic clusters",
            run.clusters.len()
        );
        *self.last_run.write().await = Some(Arc::clone(&run));
        Ok(run)
    }

    /// Up to `representatives` members nearest the centroid, nearest first.
    fn representatives(&self, members: &[usize], centroid: &[f32], vectors: &[Vec<f32>]) -> Vec<usize> {
        let mut scored: Vec<(usize, f32)> = members
            .iter()
            .map(|&i| (i, dot(&normalize(&vectors[i]), centroid)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(self.config.representatives.max(1))
            .map(|(i, _)| i)
            .collect()
    }

    async fn label(&self, cluster_id: u32, representatives: Vec<&Article>, members: Vec<&Article>) -> Label {
        let listing: Vec<String> = representatives
            .iter()
            .map(|a| {
                let snippet = a.summary.as_deref().unwrap_or(&a.content);
                let snippet: String = snippet.chars().take(SNIPPET_CHARS).collect();
                format!("- {}: {}", a.title, snippet.trim())
            })
            .collect();
        let prompt = Prompt::new(
            SYSTEM_PROMPT,
            format!(
                "These news articles belong to one topic cluster:\n\n{}\n\n\
                 Give the cluster a short name (2-5 words) and a one-sentence overview of its theme.\n\
                 Respond with a JSON object: {{\"name\": \"...\", \"summary\": \"...\"}}",
                listing.join("\n")
            ),
        )
        .with_max_tokens(300);

        let reply = match self.generator.generate(&prompt).await {
            Ok(raw) => extract_json::<LabelReply>(self.generator.name(), &raw),
            Err(e) => Err(e),
        };
        match reply {
            Ok(reply) if !reply.name.trim().is_empty() => Label {
                name: reply.name.trim().to_string(),
                summary: reply.summary.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
                source: LabelSource::Generated,
            },
            Ok(_) => {
                tracing::warn!(cluster_id, "Generated cluster name was empty, using fallback");
                fallback_label(cluster_id, &members)
            }
            Err(e) => {
                tracing::warn!(cluster_id, error = %e, "Cluster labeling failed, using fallback");
                fallback_label(cluster_id, &members)
            }
        }
    }
}

fn fallback_label(cluster_id: u32, members: &[&Article]) -> Label {
    let name = dominant_category(members)
        .or_else(|| title_keywords(members))
        .unwrap_or_else(|| format!("Topic {}", cluster_id + 1));
    Label {
        name,
        summary: None,
        source: LabelSource::Fallback,
    }
}

/// Most frequent category label; ties resolve alphabetically.
fn dominant_category(members: &[&Article]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for category in members.iter().flat_map(|a| &a.categories) {
        let category = category.trim();
        if !category.is_empty() {
            *counts.entry(category).or_insert(0) += 1;
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (category, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((category, count));
        }
    }
    best.map(|(category, _)| category.to_string())
}

fn title_keywords(members: &[&Article]) -> Option<String> {
    let mut word_freq: HashMap<String, usize> = HashMap::new();
    for article in members {
        for word in article.title.split_whitespace() {
            let w: String = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if w.chars().count() > 3 && !STOPWORDS.contains(&w.as_str()) {
                *word_freq.entry(w).or_insert(0) += 1;
            }
        }
    }
    let mut sorted: Vec<_> = word_freq.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top: Vec<String> = sorted
        .into_iter()
        .take(3)
        .map(|(w, _)| {
            let mut c = w.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
            }
        })
        .collect();
    if top.is_empty() {
        None
    } else {
        Some(top.join(" "))
    }
}
