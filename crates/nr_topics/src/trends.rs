use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use nr_core::config::ClusterConfig;
use nr_core::{Clustering, Prompt, Result, TextGenerator, TrendEntry, TrendReport};

use crate::engine::ClusterEngine;

const SYSTEM_PROMPT: &str = "You are a news analyst identifying trends and their significance.";
const TITLES_PER_CLUSTER: usize = 3;

/// Ranks topic clusters and asks the generator for a trend narrative.
pub struct TrendAggregator {
    engine: Arc<ClusterEngine>,
    generator: Arc<dyn TextGenerator>,
    top_categories: usize,
}

impl fmt::Debug for TrendAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrendAggregator")
            .field("engine", &self.engine)
            .field("generator", &self.generator.name())
            .finish()
    }
}

struct RankedCluster {
    entry: TrendEntry,
    titles: Vec<String>,
}

impl TrendAggregator {
    pub fn new(
        engine: Arc<ClusterEngine>,
        generator: Arc<dyn TextGenerator>,
        config: &ClusterConfig,
    ) -> Self {
        Self {
            engine,
            generator,
            top_categories: config.trend_top_categories,
        }
    }

    /// Digest of the current clustering plus a generated narrative.
    ///
    /// A failed narrative still returns the digest, flagged with
    /// `narrative_failed`. An empty corpus makes no provider call.
    pub async fn trending_report(&self) -> Result<TrendReport> {
        let clustering = self.engine.current().await?;
        let ranked = self.rank(&clustering);
        let digest: Vec<TrendEntry> = ranked.iter().map(|r| r.entry.clone()).collect();

        if digest.is_empty() {
            return Ok(TrendReport {
                run_id: clustering.run_id,
                generated_at: Utc::now(),
                digest,
                narrative: None,
                narrative_failed: false,
            });
        }

        tracing::info!("📈 Summarizing {} trending topics", digest.len());
        let (narrative, narrative_failed) = match self.generator.generate(&narrative_prompt(&ranked)).await {
            Ok(text) => (Some(text), false),
            Err(e) => {
                tracing::warn!(error = %e, "Trend narrative failed, returning digest only");
                (None, true)
            }
        };

        Ok(TrendReport {
            run_id: clustering.run_id,
            generated_at: Utc::now(),
            digest,
            narrative,
            narrative_failed,
        })
    }

    /// Metadata comes from the run's own snapshot, never the live store.
    fn rank(&self, clustering: &Clustering) -> Vec<RankedCluster> {
        let total = clustering.article_count();
        let mut ranked = Vec::with_capacity(clustering.clusters.len());

        for cluster in clustering.clusters.values() {
            let mut categories: BTreeMap<String, usize> = BTreeMap::new();
            let mut timestamps = Vec::new();
            let mut titles = Vec::new();
            for article in cluster.article_ids.iter().filter_map(|id| clustering.member(id)) {
                for category in &article.categories {
                    *categories.entry(category.trim().to_string()).or_insert(0) += 1;
                }
                if let Some(published) = article.published_at {
                    timestamps.push(published.timestamp_millis());
                }
                if titles.len() < TITLES_PER_CLUSTER {
                    titles.push(article.title.clone());
                }
            }
            categories.remove("");

            let mut top: Vec<(String, usize)> = categories.into_iter().collect();
            top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

            ranked.push(RankedCluster {
                entry: TrendEntry {
                    cluster_id: cluster.id,
                    name: cluster.name.clone(),
                    size: cluster.len(),
                    share: if total == 0 { 0.0 } else { cluster.len() as f32 / total as f32 },
                    top_categories: top.into_iter().take(self.top_categories).map(|(c, _)| c).collect(),
                    average_published_at: average(&timestamps),
                },
                titles,
            });
        }

        ranked.sort_by(|a, b| compare_entries(&a.entry, &b.entry));
        ranked
    }
}

/// Size descending, then most recent average timestamp (undated last), then id.
fn compare_entries(a: &TrendEntry, b: &TrendEntry) -> Ordering {
    b.size
        .cmp(&a.size)
        .then_with(|| match (a.average_published_at, b.average_published_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.cluster_id.cmp(&b.cluster_id))
}

fn average(timestamps: &[i64]) -> Option<DateTime<Utc>> {
    if timestamps.is_empty() {
        return None;
    }
    let sum: i128 = timestamps.iter().map(|&t| i128::from(t)).sum();
    let mean = (sum / timestamps.len() as i128) as i64;
    Utc.timestamp_millis_opt(mean).single()
}

fn narrative_prompt(ranked: &[RankedCluster]) -> Prompt {
    let lines: Vec<String> = ranked
        .iter()
        .map(|r| {
            let categories = if r.entry.top_categories.is_empty() {
                String::new()
            } else {
                format!(" [{}]", r.entry.top_categories.join(", "))
            };
            format!(
                "- {} ({} articles, {:.0}% of coverage){}: {}",
                r.entry.name,
                r.entry.size,
                r.entry.share * 100.0,
                categories,
                r.titles.join("; ")
            )
        })
        .collect();
    Prompt::new(
        SYSTEM_PROMPT,
        format!(
            "Analyze these news topic clusters, ordered by coverage, and identify:\n\
             1. Top 3 trending topics\n\
             2. Their significance and potential impact\n\
             3. Related developments to watch\n\n\
             Clusters:\n{}",
            lines.join("\n")
        ),
    )
}
