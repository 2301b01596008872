use crate::service::{PlatformService, PlatformStatus, QuerySource};
use cpsearch_core::Platform;
use futures::future::join_all;
use serde::Serialize;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub platform: Platform,
    pub name: String,
    pub url: String,
    pub score: f32,
}

/// Fans a query out to every platform source and merges the answers.
#[derive(Clone)]
pub struct SearchEngine {
    sources: Vec<Arc<dyn QuerySource>>,
}

impl SearchEngine {
    pub fn new(sources: Vec<Arc<dyn QuerySource>>) -> Self {
        Self { sources }
    }

    /// One [`PlatformService`] per known platform, all reading from `data_dir`.
    pub fn for_data_dir(data_dir: &Path, max_matrix_bytes: u64) -> Self {
        let sources = Platform::ALL
            .iter()
            .map(|&p| Arc::new(PlatformService::new(p, data_dir, max_matrix_bytes)) as Arc<dyn QuerySource>)
            .collect();
        Self::new(sources)
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.sources.iter().map(|s| s.platform()).collect()
    }

    /// Merged hits, best first. `filter` restricts to one platform; `limit == 0`
    /// returns everything above `threshold`. Equal scores keep source order.
    pub async fn search(&self, query: &str, filter: Option<Platform>, limit: usize, threshold: f32) -> Vec<SearchHit> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let calls = self
            .sources
            .iter()
            .filter(|s| filter.map_or(true, |p| s.platform() == p))
            .map(|source| async move {
                let platform = source.platform();
                source
                    .query(query, threshold)
                    .await
                    .into_iter()
                    .map(move |r| SearchHit { platform, name: r.name, url: r.url, score: r.score })
                    .collect::<Vec<_>>()
            });
        let mut hits: Vec<SearchHit> = join_all(calls).await.into_iter().flatten().collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        if limit > 0 {
            hits.truncate(limit);
        }
        hits
    }

    pub async fn status(&self) -> Vec<PlatformStatus> {
        join_all(self.sources.iter().map(|s| s.status())).await
    }

    /// Load every platform up front. Failures are logged, never fatal.
    pub async fn warm_up(&self) {
        let results = join_all(self.sources.iter().map(|s| async move { (s.platform(), s.initialize().await) })).await;
        for (platform, result) in results {
            if let Err(e) = result {
                tracing::warn!(%platform, error = %e, "platform unavailable at startup");
            }
        }
    }
}
