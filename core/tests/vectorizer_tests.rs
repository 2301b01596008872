use cpsearch_core::corpus::build_corpus;
use cpsearch_core::similarity::{cosine_similarity, cosine_similarity_matrix, get_top_similar, DEFAULT_THRESHOLD};
use cpsearch_core::tfidf::TfIdfVectorizer;

fn sample_docs() -> Vec<&'static str> {
    vec![
        "Given an array of integers return indices of two numbers that add up to target",
        "Find the shortest path in a weighted graph using Dijkstra",
        "Count connected components of an undirected graph",
        "Binary search over a sorted array to locate a target",
    ]
}

#[test]
fn matrix_shape_matches_corpus_and_vocabulary() {
    let docs = sample_docs();
    let mut v = TfIdfVectorizer::new();
    let m = v.fit_transform(&docs).unwrap();
    assert_eq!(m.rows(), docs.len());
    assert_eq!(m.cols(), v.vocabulary_size());
}

#[test]
fn fitting_is_deterministic() {
    let docs = sample_docs();
    let mut a = TfIdfVectorizer::new();
    let mut b = TfIdfVectorizer::new();
    let ma = a.fit_transform(&docs).unwrap();
    let mb = b.fit_transform(&docs).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.vocabulary().pairs(), b.vocabulary().pairs());
    assert_eq!(ma, mb);
}

#[test]
fn stopword_only_document_is_zero_vector() {
    let mut v = TfIdfVectorizer::new();
    v.fit(&sample_docs());
    let vec = v.document_to_vector("the and of 42 !!! ...");
    assert_eq!(vec.len(), v.vocabulary_size());
    assert!(vec.iter().all(|&x| x == 0.0));
}

#[test]
fn self_similarity_is_one() {
    let mut v = TfIdfVectorizer::new();
    let m = v.fit_transform(&sample_docs()).unwrap();
    let row = m.row(1).unwrap().to_vec();
    assert!((cosine_similarity(&row, &row) - 1.0).abs() < 1e-5);
    let zero = vec![0.0; row.len()];
    assert_eq!(cosine_similarity(&row, &zero), 0.0);
}

#[test]
fn title_weighting_breaks_ties_on_identical_bodies() {
    let names = ["Matrix Rotation", "Interval Scheduling"];
    let texts = ["given some input produce the output", "given some input produce the output"];
    let docs = build_corpus(&names, &texts).unwrap();
    let mut v = TfIdfVectorizer::new();
    let m = v.fit_transform(&docs).unwrap();
    let q = v.vectorize_query("Matrix Rotation").unwrap();
    let sims = cosine_similarity_matrix(&m, &q);
    assert!(sims[0] > sims[1]);
}

#[test]
fn two_problem_scenario_ranks_binary_search_first() {
    let names = ["Two Sum", "Binary Search"];
    let texts = ["array hashmap lookup", "sorted array search"];
    let docs = build_corpus(&names, &texts).unwrap();
    let mut v = TfIdfVectorizer::new();
    let m = v.fit_transform(&docs).unwrap();
    let q = v.vectorize_query("binary search").unwrap();
    let sims = cosine_similarity_matrix(&m, &q);
    assert!(sims.iter().all(|&s| (0.0..=1.0).contains(&s)));
    assert!(sims[1] > sims[0]);
    let top = get_top_similar(&sims, 0, DEFAULT_THRESHOLD);
    assert_eq!(top[0].index, 1);
}

#[test]
fn term_in_every_document_is_invisible() {
    let docs = ["graph tree", "graph path"];
    let mut v = TfIdfVectorizer::new();
    let m = v.fit_transform(&docs).unwrap();
    let q = v.vectorize_query("graph").unwrap();
    assert!(q.iter().all(|&x| x == 0.0));
    assert!(cosine_similarity_matrix(&m, &q).iter().all(|&s| s == 0.0));
}

#[test]
fn empty_query_vectorizes_to_zero() {
    let mut v = TfIdfVectorizer::new();
    v.fit(&sample_docs());
    let q = v.vectorize_query("").unwrap();
    assert!(q.iter().all(|&x| x == 0.0));
}
