use crate::tfidf::{DocumentTermMatrix, TfIdfVectorizer};
use crate::{CoreError, Platform, ProblemRecord, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Largest matrix artifact, in serialized bytes, written or loaded in full.
pub const DEFAULT_MAX_MATRIX_BYTES: u64 = 100 * 1024 * 1024;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub platform: Platform,
    pub num_docs: usize,
    pub vocabulary_size: usize,
    pub degraded: bool,
    pub created_at: String,
    pub version: u32,
}

impl MetaFile {
    pub fn stamp(platform: Platform, num_docs: usize, vocabulary_size: usize, degraded: bool) -> Self {
        let created_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Self { platform, num_docs, vocabulary_size, degraded, created_at, version: FORMAT_VERSION }
    }
}

/// Matrix artifact as written to disk. `Placeholder` stands in for a matrix
/// that was too large to persist and keeps only its shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatrixFile {
    Full(DocumentTermMatrix),
    Placeholder { rows: usize, cols: usize },
}

/// Result of loading a matrix: either usable vectors or an explicit marker
/// that the service must score without them.
#[derive(Debug, Clone)]
pub enum LoadedMatrix {
    Full(DocumentTermMatrix),
    Degraded { reason: String },
}

impl LoadedMatrix {
    pub fn is_degraded(&self) -> bool { matches!(self, Self::Degraded { .. }) }
}

/// Artifact layout for one platform: `<root>/<platform>/...`.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    pub root: PathBuf,
}

impl PlatformPaths {
    pub fn new<P: AsRef<Path>>(data_dir: P, platform: Platform) -> Self {
        Self { root: data_dir.as_ref().join(platform.as_str()) }
    }
    pub fn vectorizer(&self) -> PathBuf { self.root.join("vectorizer.bin") }
    pub fn matrix(&self) -> PathBuf { self.root.join("matrix.bin") }
    pub fn problems(&self) -> PathBuf { self.root.join("problems.json") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    /// Names of the artifacts a query service needs that are not on disk.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.vectorizer().is_file() { missing.push("vectorizer.bin"); }
        if !self.matrix().is_file() { missing.push("matrix.bin"); }
        if !self.problems().is_file() { missing.push("problems.json"); }
        missing
    }

    pub fn is_ready(&self) -> bool { self.missing().is_empty() }
}

pub fn save_vectorizer(paths: &PlatformPaths, vectorizer: &TfIdfVectorizer) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.vectorizer())?;
    let bytes = bincode::serialize(vectorizer)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_vectorizer(paths: &PlatformPaths) -> Result<TfIdfVectorizer> {
    let mut f = File::open(paths.vectorizer())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let vectorizer = bincode::deserialize(&buf)?;
    Ok(vectorizer)
}

/// Write the matrix, or a placeholder when the serialized artifact would
/// exceed `max_bytes`. The loader measures the same quantity on disk, so a
/// matrix written in full also loads in full under the same limit.
/// Returns true when the placeholder was written.
pub fn save_matrix(paths: &PlatformPaths, matrix: &DocumentTermMatrix, max_bytes: u64) -> Result<bool> {
    create_dir_all(&paths.root)?;
    let full = MatrixFile::Full(matrix.clone());
    let size = bincode::serialized_size(&full)?;
    let degraded = size > max_bytes;
    let file = if degraded {
        tracing::warn!(size, max_bytes, rows = matrix.rows(), cols = matrix.cols(), "matrix too large, writing placeholder");
        MatrixFile::Placeholder { rows: matrix.rows(), cols: matrix.cols() }
    } else {
        full
    };
    let mut f = BufWriter::new(File::create(paths.matrix())?);
    bincode::serialize_into(&mut f, &file)?;
    f.flush()?;
    Ok(degraded)
}

/// How a matrix artifact gets turned into a [`LoadedMatrix`].
pub trait MatrixLoader {
    fn load(&self, path: &Path) -> Result<LoadedMatrix>;
}

/// Deserializes the artifact. A stored placeholder still comes back degraded.
pub struct FullMatrixLoader;

impl MatrixLoader for FullMatrixLoader {
    fn load(&self, path: &Path) -> Result<LoadedMatrix> {
        let reader = BufReader::new(File::open(path)?);
        match bincode::deserialize_from(reader)? {
            MatrixFile::Full(m) => {
                let (rows, cols) = (m.rows(), m.cols());
                Ok(LoadedMatrix::Full(DocumentTermMatrix::from_raw(rows, cols, m.into_data())?))
            }
            MatrixFile::Placeholder { rows, cols } => Ok(LoadedMatrix::Degraded {
                reason: format!("indexer stored a placeholder for a {rows}x{cols} matrix"),
            }),
        }
    }
}

/// Never reads the payload.
pub struct PlaceholderMatrixLoader {
    pub size: u64,
    pub max_bytes: u64,
}

impl MatrixLoader for PlaceholderMatrixLoader {
    fn load(&self, _path: &Path) -> Result<LoadedMatrix> {
        Ok(LoadedMatrix::Degraded {
            reason: format!("matrix artifact is {} bytes, limit is {}", self.size, self.max_bytes),
        })
    }
}

/// Pre-flight size check picking the loader for a matrix artifact.
pub fn select_loader(path: &Path, max_bytes: u64) -> Result<Box<dyn MatrixLoader>> {
    let size = fs::metadata(path)?.len();
    if size > max_bytes {
        Ok(Box::new(PlaceholderMatrixLoader { size, max_bytes }))
    } else {
        Ok(Box::new(FullMatrixLoader))
    }
}

pub fn load_matrix(paths: &PlatformPaths, max_bytes: u64) -> Result<LoadedMatrix> {
    let path = paths.matrix();
    let loaded = select_loader(&path, max_bytes)?.load(&path)?;
    if let LoadedMatrix::Degraded { reason } = &loaded {
        tracing::warn!(path = %path.display(), %reason, "using degraded matrix");
    }
    Ok(loaded)
}

pub fn save_problems(paths: &PlatformPaths, problems: &[ProblemRecord]) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = BufWriter::new(File::create(paths.problems())?);
    serde_json::to_writer(&mut f, problems)?;
    f.flush()?;
    Ok(())
}

pub fn load_problems(paths: &PlatformPaths) -> Result<Vec<ProblemRecord>> {
    let f = BufReader::new(File::open(paths.problems())?);
    let problems = serde_json::from_reader(f)?;
    Ok(problems)
}

pub fn save_meta(paths: &PlatformPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &PlatformPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Everything a query service holds in memory for one platform.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub vectorizer: TfIdfVectorizer,
    pub matrix: LoadedMatrix,
    pub problems: Vec<ProblemRecord>,
}

/// Load the artifacts a query service needs. Missing files are reported as
/// [`CoreError::DataNotReady`]; a full matrix whose row count disagrees with
/// the problem table is rejected.
pub fn load_index(platform: Platform, paths: &PlatformPaths, max_matrix_bytes: u64) -> Result<LoadedIndex> {
    let missing = paths.missing();
    if !missing.is_empty() {
        return Err(CoreError::DataNotReady { platform: platform.to_string(), missing: missing.join(", ") });
    }
    let vectorizer = load_vectorizer(paths)?;
    let matrix = load_matrix(paths, max_matrix_bytes)?;
    let problems = load_problems(paths)?;
    if let LoadedMatrix::Full(m) = &matrix {
        if m.rows() != problems.len() {
            return Err(CoreError::LengthMismatch { what: "matrix rows vs problems", left: m.rows(), right: problems.len() });
        }
        if m.cols() != vectorizer.vocabulary_size() {
            return Err(CoreError::LengthMismatch { what: "matrix cols vs vocabulary", left: m.cols(), right: vectorizer.vocabulary_size() });
        }
    }
    Ok(LoadedIndex { vectorizer, matrix, problems })
}
