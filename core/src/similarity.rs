use crate::tfidf::DocumentTermMatrix;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const DEFAULT_THRESHOLD: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scored {
    pub index: usize,
    pub score: f32,
}

/// cos(θ) = Σ(a_i * b_i) / (||a|| * ||b||); 0 when either side has no norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }
    // tail of the longer vector still counts toward its norm
    for &x in a.iter().skip(b.len()) { norm_a += x as f64 * x as f64; }
    for &y in b.iter().skip(a.len()) { norm_b += y as f64 * y as f64; }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}

/// Similarity of `query` against every row, in row order.
pub fn cosine_similarity_matrix(matrix: &DocumentTermMatrix, query: &[f32]) -> Vec<f32> {
    matrix.iter_rows().map(|row| cosine_similarity(row, query)).collect()
}

/// Descending by score, ties by ascending index.
pub fn rank_desc(a: &Scored, b: &Scored) -> Ordering {
    b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then(a.index.cmp(&b.index))
}

/// Rows scoring at least `threshold`, best first. `k == 0` keeps all of them.
pub fn get_top_similar(similarities: &[f32], k: usize, threshold: f32) -> Vec<Scored> {
    let mut scored: Vec<Scored> = similarities
        .iter()
        .enumerate()
        .filter(|&(_, &s)| s >= threshold)
        .map(|(index, &score)| Scored { index, score })
        .collect();
    scored.sort_by(rank_desc);
    if k > 0 && k < scored.len() {
        scored.truncate(k);
    }
    scored
}
