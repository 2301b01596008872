//! Per-platform query service: loads a platform's artifacts once and serves
//! queries against them.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use cpsearch_core::persist::{load_index, LoadedIndex, PlatformPaths};
use cpsearch_core::query::search_index;
use cpsearch_core::{Platform, QueryResult};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStatus {
    pub platform: Platform,
    pub initialized: bool,
    pub data_ready: bool,
    pub problem_count: usize,
    pub vocabulary_size: usize,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlatformStatus {
    pub fn empty(platform: Platform) -> Self {
        Self {
            platform,
            initialized: false,
            data_ready: false,
            problem_count: 0,
            vocabulary_size: 0,
            degraded: false,
            error: None,
        }
    }
}

/// A searchable problem source. Implementations must not fail a query:
/// anything that goes wrong becomes an empty result list.
#[async_trait]
pub trait QuerySource: Send + Sync {
    fn platform(&self) -> Platform;

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn query(&self, text: &str, threshold: f32) -> Vec<QueryResult>;

    async fn status(&self) -> PlatformStatus;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

enum ServiceState {
    Uninitialized,
    Initializing,
    Ready(Arc<LoadedIndex>),
    Failed(String),
}

pub struct PlatformService {
    platform: Platform,
    paths: PlatformPaths,
    max_matrix_bytes: u64,
    state: RwLock<ServiceState>,
    // one load in flight per platform
    init_lock: Mutex<()>,
}

impl PlatformService {
    pub fn new(platform: Platform, data_dir: &Path, max_matrix_bytes: u64) -> Self {
        Self {
            platform,
            paths: PlatformPaths::new(data_dir, platform),
            max_matrix_bytes,
            state: RwLock::new(ServiceState::Uninitialized),
            init_lock: Mutex::new(()),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match &*self.state.read() {
            ServiceState::Uninitialized => Lifecycle::Uninitialized,
            ServiceState::Initializing => Lifecycle::Initializing,
            ServiceState::Ready(_) => Lifecycle::Ready,
            ServiceState::Failed(_) => Lifecycle::Failed,
        }
    }

    /// Why the last load failed, while the service sits in `Failed`.
    pub fn last_error(&self) -> Option<String> {
        match &*self.state.read() {
            ServiceState::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    fn ready_index(&self) -> Option<Arc<LoadedIndex>> {
        match &*self.state.read() {
            ServiceState::Ready(index) => Some(index.clone()),
            _ => None,
        }
    }

    /// Load the platform's artifacts. A no-op once ready; a failed service
    /// retries on the next call.
    pub async fn load(&self) -> Result<Arc<LoadedIndex>> {
        if let Some(index) = self.ready_index() {
            return Ok(index);
        }
        let _guard = self.init_lock.lock().await;
        if let Some(index) = self.ready_index() {
            return Ok(index);
        }
        *self.state.write() = ServiceState::Initializing;

        let platform = self.platform;
        let paths = self.paths.clone();
        let max_bytes = self.max_matrix_bytes;
        let loaded = tokio::task::spawn_blocking(move || load_index(platform, &paths, max_bytes))
            .await
            .map_err(|e| anyhow!("loader task for {platform} failed: {e}"))
            .and_then(|r| r.map_err(anyhow::Error::from));

        match loaded {
            Ok(index) => {
                let index = Arc::new(index);
                tracing::info!(
                    %platform,
                    problems = index.problems.len(),
                    vocabulary = index.vectorizer.vocabulary_size(),
                    degraded = index.matrix.is_degraded(),
                    "platform ready"
                );
                *self.state.write() = ServiceState::Ready(index.clone());
                Ok(index)
            }
            Err(e) => {
                *self.state.write() = ServiceState::Failed(e.to_string());
                Err(e)
            }
        }
    }
}

#[async_trait]
impl QuerySource for PlatformService {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn initialize(&self) -> Result<()> {
        self.load().await.map(|_| ())
    }

    async fn query(&self, text: &str, threshold: f32) -> Vec<QueryResult> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let platform = self.platform;
        let index = match self.load().await {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(%platform, error = %e, "platform not ready, returning no results");
                return Vec::new();
            }
        };
        let text = text.to_string();
        let scored = tokio::task::spawn_blocking(move || search_index(&index, &text, threshold)).await;
        match scored {
            Ok(Ok(results)) => {
                tracing::debug!(%platform, hits = results.len(), "query served");
                results
            }
            Ok(Err(e)) => {
                tracing::error!(%platform, error = %e, "query failed");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(%platform, error = %e, "query task failed");
                Vec::new()
            }
        }
    }

    async fn status(&self) -> PlatformStatus {
        let mut status = PlatformStatus::empty(self.platform);
        status.data_ready = self.paths.is_ready();
        match self.load().await {
            Ok(index) => {
                status.initialized = true;
                status.problem_count = index.problems.len();
                status.vocabulary_size = index.vectorizer.vocabulary_size();
                status.degraded = index.matrix.is_degraded();
            }
            Err(e) => status.error = self.last_error().or_else(|| Some(e.to_string())),
        }
        status
    }
}
