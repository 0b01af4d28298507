use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use medsearch_core::persist::{save_index, IndexPaths};
use medsearch_core::{DrugRecord, SearchIndex};
use serde_json::Value;
use server::{build_app, router, AppState, SharedIndex};
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use tower::ServiceExt;

fn records() -> Vec<DrugRecord> {
    vec![
        DrugRecord::new("OBT001", "Panadol", "Meredakan demam dan sakit kepala").with_price(12_000),
        DrugRecord::new("OBT002", "OBH Combi", "Meredakan batuk berdahak").with_price(18_000),
        DrugRecord::new("OBT003", "Amoxicillin", "Mengobati infeksi bakteri disertai demam")
            .with_prescription(true)
            .with_price(30_000),
    ]
}

fn build_tiny_index(dir: &Path, records: Vec<DrugRecord>) {
    let index = SearchIndex::build(records).unwrap();
    save_index(&IndexPaths::new(dir), &index).unwrap();
}

fn app_with_token(dir: &Path, token: &str) -> Router {
    let index = medsearch_core::persist::load_index(&IndexPaths::new(dir)).unwrap();
    router(AppState {
        index: SharedIndex::new(index),
        index_paths_root: PathBuf::from(dir),
        admin_token: Some(token.to_string()),
    })
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), records());
    let app = build_app(dir.path().to_string_lossy().to_string(), None).unwrap();

    let (status, json) = get(app, "/search?q=demam%20sakit%20kepala&k=5").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["id"], "OBT001");
    assert_eq!(arr[1]["id"], "OBT003");
    assert!(arr[0]["score"].as_f64().unwrap() >= arr[1]["score"].as_f64().unwrap());
    assert_eq!(json["terms"], serde_json::json!(["demam", "sakit", "kepala"]));
}

#[tokio::test]
async fn search_applies_filters() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), records());
    let app = build_app(dir.path().to_string_lossy().to_string(), None).unwrap();

    let (_, json) = get(app.clone(), "/search?q=demam&rx=true").await;
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["id"], "OBT003");

    let (_, json) = get(app, "/search?q=demam&min_price=0&max_price=0").await;
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn stopword_query_is_empty_not_an_error() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), records());
    let app = build_app(dir.path().to_string_lossy().to_string(), None).unwrap();
    let (status, json) = get(app, "/search?q=yang%20dan").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 0);
}

#[tokio::test]
async fn doc_and_term_lookups() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), records());
    let app = build_app(dir.path().to_string_lossy().to_string(), None).unwrap();

    let (status, json) = get(app.clone(), "/doc/OBT002").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["record"]["name"], "OBH Combi");

    let (status, _) = get(app.clone(), "/doc/OBT999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = get(app.clone(), "/term/demam").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["info"]["df"], 2);

    let (status, _) = get(app, "/term/vertigo").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_requires_token_and_swaps_index() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path(), records());
    let app = app_with_token(dir.path(), "secret");

    let req = Request::post("/index/reload").body(Body::empty()).unwrap();
    let (status, _) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // rebuild the artifact with an extra record, then reload it
    let mut more = records();
    more.push(DrugRecord::new("OBT004", "Promag", "Mengatasi maag").with_price(8_000));
    build_tiny_index(dir.path(), more);

    let (_, json) = get(app.clone(), "/search?q=maag").await;
    assert!(json["results"].as_array().unwrap().is_empty());

    let req = Request::post("/index/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_docs"], 4);

    let (_, json) = get(app, "/search?q=maag").await;
    assert_eq!(json["results"][0]["id"], "OBT004");
}
