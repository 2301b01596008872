use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use cpsearch_core::corpus::corpus_for;
use cpsearch_core::persist::{save_matrix, save_problems, save_vectorizer, PlatformPaths, DEFAULT_MAX_MATRIX_BYTES};
use cpsearch_core::tfidf::TfIdfVectorizer;
use cpsearch_core::{Platform, ProblemRecord};
use futures::future::join_all;
use http_body_util::BodyExt;
use serde_json::Value;
use server::config::ServerConfig;
use server::service::{Lifecycle, PlatformService, QuerySource};
use tempfile::tempdir;
use tower::ServiceExt;

fn problem(name: &str, text: &str) -> ProblemRecord {
    ProblemRecord {
        name: name.into(),
        url: format!("https://leetcode.com/problems/{}/", name.to_lowercase().replace(' ', "-")),
        tag: String::new(),
        difficulty: "Easy".into(),
        text: text.into(),
    }
}

fn sample_problems() -> Vec<ProblemRecord> {
    vec![
        problem("Two Sum", "array hashmap lookup"),
        problem("Binary Search", "sorted array search"),
        problem("Graph Coloring", "color the vertices of a graph"),
    ]
}

fn build_tiny_index(dir: &std::path::Path, problems: &[ProblemRecord], max_matrix_bytes: u64) {
    let paths = PlatformPaths::new(dir, Platform::Leetcode);
    let mut vectorizer = TfIdfVectorizer::new();
    let matrix = vectorizer.fit_transform(&corpus_for(problems)).unwrap();
    save_vectorizer(&paths, &vectorizer).unwrap();
    save_matrix(&paths, &matrix, max_matrix_bytes).unwrap();
    save_problems(&paths, problems).unwrap();
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &sample_problems(), DEFAULT_MAX_MATRIX_BYTES);
    let app = server::build_app(&ServerConfig::new(dir.path())).unwrap();

    let (status, body) = call(app, "/search?q=binary%20search&platform=leetcode").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["results"].as_array().unwrap();
    assert!(!arr.is_empty());
    assert_eq!(arr[0]["name"], "Binary Search");
    assert_eq!(arr[0]["platform"], "leetcode");
    let scores: Vec<f64> = arr.iter().map(|h| h["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(scores.iter().all(|&s| (0.0..=1.0).contains(&s)));
}

#[tokio::test]
async fn unknown_platform_is_bad_request() {
    let dir = tempdir().unwrap();
    let app = server::build_app(&ServerConfig::new(dir.path())).unwrap();
    let (status, _) = call(app, "/search?q=graph&platform=atcoder").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_artifacts_give_empty_results_not_errors() {
    let dir = tempdir().unwrap();
    let app = server::build_app(&ServerConfig::new(dir.path())).unwrap();
    let (status, body) = call(app, "/search?q=graph").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"], 0);
}

#[tokio::test]
async fn health_reports_each_platform() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &sample_problems(), DEFAULT_MAX_MATRIX_BYTES);
    let app = server::build_app(&ServerConfig::new(dir.path())).unwrap();
    let (status, body) = call(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let platforms = json["platforms"].as_array().unwrap();
    assert_eq!(platforms.len(), 3);
    let lc = platforms.iter().find(|p| p["platform"] == "leetcode").unwrap();
    assert_eq!(lc["initialized"], true);
    assert_eq!(lc["problem_count"], 3);
    let cf = platforms.iter().find(|p| p["platform"] == "codeforces").unwrap();
    assert_eq!(cf["data_ready"], false);
    assert!(cf["error"].as_str().unwrap().contains("data not ready"));
}

#[tokio::test]
async fn service_lifecycle_and_idempotent_initialize() {
    let dir = tempdir().unwrap();
    let svc = PlatformService::new(Platform::Leetcode, dir.path(), DEFAULT_MAX_MATRIX_BYTES);
    assert_eq!(svc.lifecycle(), Lifecycle::Uninitialized);
    assert!(svc.initialize().await.is_err());
    assert_eq!(svc.lifecycle(), Lifecycle::Failed);
    assert!(svc.last_error().unwrap().contains("data not ready"));
    assert!(svc.query("binary search", 0.01).await.is_empty());

    // artifacts built after a failure are picked up on retry
    build_tiny_index(dir.path(), &sample_problems(), DEFAULT_MAX_MATRIX_BYTES);
    svc.initialize().await.unwrap();
    assert_eq!(svc.lifecycle(), Lifecycle::Ready);
    assert!(svc.last_error().is_none());
    let first = svc.load().await.unwrap();
    let second = svc.load().await.unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn empty_query_is_empty_everywhere() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &sample_problems(), DEFAULT_MAX_MATRIX_BYTES);
    let svc = PlatformService::new(Platform::Leetcode, dir.path(), DEFAULT_MAX_MATRIX_BYTES);
    assert!(svc.query("", 0.01).await.is_empty());
    // an empty query never triggers a load
    assert_eq!(svc.lifecycle(), Lifecycle::Uninitialized);
}

#[tokio::test]
async fn oversized_matrix_falls_back_to_name_matching() {
    let dir = tempdir().unwrap();
    let problems = vec![problem("Binary Search Tree", "nodes keys"), problem("Graph Coloring", "vertices")];
    build_tiny_index(dir.path(), &problems, 1);
    let svc = PlatformService::new(Platform::Leetcode, dir.path(), DEFAULT_MAX_MATRIX_BYTES);
    let results = svc.query("binary search", 0.01).await;
    assert!(!results.is_empty());
    assert_eq!(results[0].name, "Binary Search Tree");
    assert!(svc.status().await.degraded);
}

#[tokio::test]
async fn load_time_size_guard_degrades_instead_of_failing() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &sample_problems(), DEFAULT_MAX_MATRIX_BYTES);
    let svc = PlatformService::new(Platform::Leetcode, dir.path(), 8);
    let results = svc.query("graph coloring", 0.01).await;
    assert_eq!(results[0].name, "Graph Coloring");
    let status = svc.status().await;
    assert!(status.initialized);
    assert!(status.degraded);
    assert!(status.error.is_none());
}

async fn hit_count(app: Router, uri: &str) -> usize {
    let (status, body) = call(app, uri).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    json["results"].as_array().unwrap().len()
}

#[tokio::test]
async fn non_positive_limit_means_unbounded() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &sample_problems(), DEFAULT_MAX_MATRIX_BYTES);
    let mut config = ServerConfig::new(dir.path());
    config.default_limit = 1;
    let app = server::build_app(&config).unwrap();

    // "array" appears in Two Sum and Binary Search
    assert_eq!(hit_count(app.clone(), "/search?q=array").await, 1);
    assert_eq!(hit_count(app.clone(), "/search?q=array&limit=1").await, 1);
    assert_eq!(hit_count(app.clone(), "/search?q=array&limit=0").await, 2);
    assert_eq!(hit_count(app, "/search?q=array&limit=-1").await, 2);
}

#[tokio::test]
async fn concurrent_first_loads_share_one_index() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), &sample_problems(), DEFAULT_MAX_MATRIX_BYTES);
    let svc = PlatformService::new(Platform::Leetcode, dir.path(), DEFAULT_MAX_MATRIX_BYTES);
    let loaded: Vec<_> = join_all((0..8).map(|_| svc.load())).await.into_iter().map(|r| r.unwrap()).collect();
    assert!(loaded.iter().all(|idx| std::sync::Arc::ptr_eq(idx, &loaded[0])));
    assert_eq!(svc.lifecycle(), Lifecycle::Ready);
}

fn is_rounded(score: f32) -> bool {
    (score * 1000.0).round() / 1000.0 == score
}

#[tokio::test]
async fn query_scores_are_rounded_to_three_decimals() {
    let full_dir = tempdir().unwrap();
    build_tiny_index(full_dir.path(), &sample_problems(), DEFAULT_MAX_MATRIX_BYTES);
    let full = PlatformService::new(Platform::Leetcode, full_dir.path(), DEFAULT_MAX_MATRIX_BYTES);
    let results = full.query("sorted array search", 0.0001).await;
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| is_rounded(r.score)));

    let degraded_dir = tempdir().unwrap();
    let problems = vec![problem("Binary Search Tree", ""), problem("Search Insert Position", ""), problem("Graph Coloring", "")];
    build_tiny_index(degraded_dir.path(), &problems, 1);
    let degraded = PlatformService::new(Platform::Leetcode, degraded_dir.path(), DEFAULT_MAX_MATRIX_BYTES);
    // three terms make the per-term average a repeating decimal before rounding
    let results = degraded.query("binary search trees", 0.01).await;
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| is_rounded(r.score)));
}
