//! Query-time scoring against a loaded platform index.

use crate::persist::{LoadedIndex, LoadedMatrix};
use crate::similarity::{cosine_similarity_matrix, get_top_similar, rank_desc, Scored};
use crate::tfidf::{DocumentTermMatrix, TfIdfVectorizer};
use crate::{round_score, ProblemRecord, QueryResult, Result};

/// Result cap for substring scoring.
pub const FALLBACK_LIMIT: usize = 50;

const EXACT_HIT: f32 = 0.5;
const LOOSE_HIT: f32 = 0.2;

/// Score `text` against every problem, keep those at or above `threshold`,
/// best first. Uses the vectors when the matrix loaded, substring overlap on
/// problem names otherwise.
pub fn search_index(index: &LoadedIndex, text: &str, threshold: f32) -> Result<Vec<QueryResult>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match &index.matrix {
        LoadedMatrix::Full(matrix) => rank_by_vectors(&index.vectorizer, matrix, &index.problems, text, threshold),
        LoadedMatrix::Degraded { .. } => Ok(rank_by_substring(&index.problems, text, threshold)),
    }
}

/// Cosine similarity of the query vector against every matrix row. No top-k cap.
pub fn rank_by_vectors(
    vectorizer: &TfIdfVectorizer,
    matrix: &DocumentTermMatrix,
    problems: &[ProblemRecord],
    text: &str,
    threshold: f32,
) -> Result<Vec<QueryResult>> {
    let query = vectorizer.vectorize_query(text)?;
    let sims = cosine_similarity_matrix(matrix, &query);
    Ok(to_results(get_top_similar(&sims, 0, threshold), problems))
}

/// Substring overlap between query terms (longer than two characters) and
/// lowercased problem names: 0.5 per term found verbatim, 0.2 more per term
/// whose stem (last two characters dropped, at least three left) is found.
/// The sum is divided by the term count. At most [`FALLBACK_LIMIT`] results.
pub fn rank_by_substring(problems: &[ProblemRecord], text: &str, threshold: f32) -> Vec<QueryResult> {
    let lowered = text.to_lowercase();
    let terms: Vec<&str> = lowered.split_whitespace().filter(|t| t.chars().count() > 2).collect();
    if terms.is_empty() {
        return Vec::new();
    }
    let stems: Vec<Option<String>> = terms.iter().map(|t| loose_stem(t)).collect();

    let mut scored: Vec<Scored> = problems
        .iter()
        .enumerate()
        .filter_map(|(index, p)| {
            let name = p.name.to_lowercase();
            let mut score = 0.0f32;
            for (term, stem) in terms.iter().zip(&stems) {
                if name.contains(term) {
                    score += EXACT_HIT;
                }
                if stem.as_deref().is_some_and(|s| name.contains(s)) {
                    score += LOOSE_HIT;
                }
            }
            let score = score / terms.len() as f32;
            (score >= threshold).then_some(Scored { index, score })
        })
        .collect();
    scored.sort_by(rank_desc);
    scored.truncate(FALLBACK_LIMIT);
    to_results(scored, problems)
}

fn loose_stem(term: &str) -> Option<String> {
    let n = term.chars().count();
    if n < 5 {
        return None;
    }
    Some(term.chars().take(n - 2).collect())
}

fn to_results(scored: Vec<Scored>, problems: &[ProblemRecord]) -> Vec<QueryResult> {
    scored
        .into_iter()
        .filter_map(|s| {
            problems.get(s.index).map(|p| QueryResult {
                name: p.name.clone(),
                url: p.url.clone(),
                score: round_score(s.score),
            })
        })
        .collect()
}
