use crate::tokenizer::preprocess;
use crate::{CoreError, DocumentVector, Result, TermId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Term -> dense column index, assigned in first-seen order while fitting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, TermId>,
}

impl Vocabulary {
    fn from_tokenized(docs: &[Vec<String>]) -> Self {
        let mut vocab = Self::default();
        for tokens in docs {
            for token in tokens {
                if !vocab.index.contains_key(token) {
                    vocab.index.insert(token.clone(), vocab.terms.len());
                    vocab.terms.push(token.clone());
                }
            }
        }
        vocab
    }

    /// Rebuild from persisted `(term, index)` pairs. The indices must form
    /// exactly `0..pairs.len()` with no term repeated.
    pub fn from_pairs(pairs: Vec<(String, TermId)>) -> Result<Self> {
        let n = pairs.len();
        let mut slots: Vec<Option<String>> = vec![None; n];
        let mut index = HashMap::with_capacity(n);
        for (term, id) in pairs {
            if id >= n || slots[id].is_some() {
                return Err(CoreError::Invalid(format!("vocabulary index {id} out of range or repeated")));
            }
            if index.insert(term.clone(), id).is_some() {
                return Err(CoreError::Invalid(format!("vocabulary term {term:?} repeated")));
            }
            slots[id] = Some(term);
        }
        let terms = slots.into_iter().map(|t| t.unwrap_or_default()).collect();
        Ok(Self { terms, index })
    }

    pub fn pairs(&self) -> Vec<(String, TermId)> {
        self.terms.iter().cloned().enumerate().map(|(i, t)| (t, i)).collect()
    }

    pub fn get(&self, term: &str) -> Option<TermId> { self.index.get(term).copied() }

    pub fn term(&self, id: TermId) -> Option<&str> { self.terms.get(id).map(String::as_str) }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

/// IDF weight per vocabulary column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdfTable {
    weights: Vec<f32>,
}

impl IdfTable {
    fn from_tokenized(docs: &[Vec<String>], vocab: &Vocabulary) -> Self {
        let mut df = vec![0u32; vocab.len()];
        for tokens in docs {
            let seen: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in seen {
                if let Some(id) = vocab.get(term) {
                    df[id] += 1;
                }
            }
        }
        let n = docs.len() as f64;
        // Unsmoothed: a term present in every document weighs ln(1) = 0.
        let weights = df
            .into_iter()
            .map(|d| if d > 0 { (n / d as f64).ln() as f32 } else { 0.0 })
            .collect();
        Self { weights }
    }

    /// Weight of a column; unknown columns weigh nothing.
    pub fn weight(&self, id: TermId) -> f32 { self.weights.get(id).copied().unwrap_or(0.0) }

    pub fn len(&self) -> usize { self.weights.len() }

    pub fn is_empty(&self) -> bool { self.weights.is_empty() }
}

pub fn build_vocabulary<S: AsRef<str>>(documents: &[S]) -> Vocabulary {
    Vocabulary::from_tokenized(&tokenize_all(documents))
}

pub fn calculate_idf<S: AsRef<str>>(documents: &[S], vocabulary: &Vocabulary) -> IdfTable {
    IdfTable::from_tokenized(&tokenize_all(documents), vocabulary)
}

fn tokenize_all<S: AsRef<str>>(documents: &[S]) -> Vec<Vec<String>> {
    documents.iter().map(|d| preprocess(d.as_ref())).collect()
}

/// Row-major document-term matrix. Row `i` belongs to corpus document `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTermMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl DocumentTermMatrix {
    pub fn from_rows(rows: Vec<DocumentVector>, cols: usize) -> Result<Self> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * cols);
        for row in rows {
            if row.len() != cols {
                return Err(CoreError::LengthMismatch { what: "matrix row width", left: row.len(), right: cols });
            }
            data.extend(row);
        }
        Ok(Self { rows: n, cols, data })
    }

    pub fn from_raw(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if rows * cols != data.len() {
            return Err(CoreError::LengthMismatch { what: "matrix payload", left: data.len(), right: rows * cols });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize { self.rows }

    pub fn cols(&self) -> usize { self.cols }

    pub fn data(&self) -> &[f32] { &self.data }

    pub fn into_data(self) -> Vec<f32> { self.data }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        if i >= self.rows {
            return None;
        }
        Some(&self.data[i * self.cols..(i + 1) * self.cols])
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        // chunks_exact(0) panics, and a zero-width matrix still has rows
        let cols = self.cols;
        (0..self.rows).map(move |i| &self.data[i * cols..(i + 1) * cols])
    }
}

/// TF-IDF vectorizer: fit once on a corpus, then transform documents or
/// queries into dense vectors over the fitted vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "VectorizerFile", try_from = "VectorizerFile")]
pub struct TfIdfVectorizer {
    vocabulary: Vocabulary,
    idf: IdfTable,
    fitted: bool,
}

impl TfIdfVectorizer {
    pub fn new() -> Self { Self::default() }

    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) {
        let tokenized = tokenize_all(documents);
        self.vocabulary = Vocabulary::from_tokenized(&tokenized);
        self.idf = IdfTable::from_tokenized(&tokenized, &self.vocabulary);
        self.fitted = true;
        tracing::debug!(docs = documents.len(), vocabulary = self.vocabulary.len(), "vectorizer fitted");
    }

    pub fn is_fitted(&self) -> bool { self.fitted }

    pub fn vocabulary(&self) -> &Vocabulary { &self.vocabulary }

    pub fn idf(&self) -> &IdfTable { &self.idf }

    pub fn vocabulary_size(&self) -> usize { self.vocabulary.len() }

    /// Term counts normalized by document length, times IDF. Terms outside
    /// the vocabulary are dropped. Vectors are not L2-normalized.
    pub fn document_to_vector(&self, doc: &str) -> DocumentVector {
        let mut vector = vec![0.0f32; self.vocabulary.len()];
        let tokens = preprocess(doc);
        if tokens.is_empty() {
            return vector;
        }
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for token in &tokens {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }
        let total = tokens.len() as f32;
        for (term, count) in counts {
            if let Some(id) = self.vocabulary.get(term) {
                vector[id] = (count as f32 / total) * self.idf.weight(id);
            }
        }
        vector
    }

    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<DocumentTermMatrix> {
        if !self.fitted {
            return Err(CoreError::NotFitted);
        }
        let rows = documents.iter().map(|d| self.document_to_vector(d.as_ref())).collect();
        DocumentTermMatrix::from_rows(rows, self.vocabulary.len())
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<DocumentTermMatrix> {
        self.fit(documents);
        self.transform(documents)
    }

    /// Vectorize free query text the same way documents are.
    pub fn vectorize_query(&self, query: &str) -> Result<DocumentVector> {
        if !self.fitted {
            return Err(CoreError::NotFitted);
        }
        Ok(self.document_to_vector(&query.to_lowercase()))
    }
}

/// On-disk shape: ordered `(term, index)` and `(term, weight)` pairs plus the fitted flag.
#[derive(Debug, Serialize, Deserialize)]
struct VectorizerFile {
    vocabulary: Vec<(String, TermId)>,
    idf: Vec<(String, f32)>,
    fitted: bool,
}

impl From<TfIdfVectorizer> for VectorizerFile {
    fn from(v: TfIdfVectorizer) -> Self {
        let idf = v
            .vocabulary
            .terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), v.idf.weight(i)))
            .collect();
        Self { vocabulary: v.vocabulary.pairs(), idf, fitted: v.fitted }
    }
}

impl TryFrom<VectorizerFile> for TfIdfVectorizer {
    type Error = CoreError;

    fn try_from(file: VectorizerFile) -> Result<Self> {
        let vocabulary = Vocabulary::from_pairs(file.vocabulary)?;
        let mut weights = vec![0.0f32; vocabulary.len()];
        for (term, weight) in file.idf {
            // IDF rows for terms outside the vocabulary carry no column
            if let Some(id) = vocabulary.get(&term) {
                weights[id] = weight;
            }
        }
        Ok(Self { vocabulary, idf: IdfTable { weights }, fitted: file.fitted })
    }
}
