use cpsearch_core::persist::DEFAULT_MAX_MATRIX_BYTES;
use cpsearch_core::similarity::DEFAULT_THRESHOLD;
use std::path::PathBuf;

const ENV_MAX_MATRIX_BYTES: &str = "CPSEARCH_MAX_MATRIX_BYTES";
const ENV_DEFAULT_THRESHOLD: &str = "CPSEARCH_DEFAULT_THRESHOLD";
const ENV_DEFAULT_LIMIT: &str = "CPSEARCH_DEFAULT_LIMIT";
const ENV_CORS_ALLOW_ORIGIN: &str = "CORS_ALLOW_ORIGIN";

const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub max_matrix_bytes: u64,
    pub default_threshold: f32,
    /// 0 means unbounded.
    pub default_limit: usize,
    /// Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_matrix_bytes: DEFAULT_MAX_MATRIX_BYTES,
            default_threshold: DEFAULT_THRESHOLD,
            default_limit: DEFAULT_LIMIT,
            cors_origins: Vec::new(),
        }
    }

    /// Defaults overridden by environment variables; unparseable values are ignored.
    pub fn from_env(data_dir: impl Into<PathBuf>) -> Self {
        let mut cfg = Self::new(data_dir);
        if let Some(v) = read_env::<u64>(ENV_MAX_MATRIX_BYTES) {
            cfg.max_matrix_bytes = v;
        }
        if let Some(v) = read_env::<f32>(ENV_DEFAULT_THRESHOLD).filter(|v| v.is_finite()) {
            cfg.default_threshold = v;
        }
        if let Some(v) = read_env::<usize>(ENV_DEFAULT_LIMIT) {
            cfg.default_limit = v;
        }
        if let Ok(raw) = std::env::var(ENV_CORS_ALLOW_ORIGIN) {
            cfg.cors_origins = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        cfg
    }
}

#[must_use]
fn read_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse::<T>().ok())
}
