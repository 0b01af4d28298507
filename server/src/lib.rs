use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use medsearch_core::persist::{load_index, IndexPaths};
use medsearch_core::{SearchHit, SearchIndex, SearchOptions, DEFAULT_TOP_K};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    /// Prescription filter: true = prescription only, false = over the counter only.
    pub rx: Option<bool>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    #[serde(default)]
    pub include_zero: bool,
}
fn default_k() -> usize { DEFAULT_TOP_K }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub terms: Vec<String>,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<ResultItem>,
}

#[derive(Serialize)]
pub struct ResultItem {
    pub id: String,
    pub score: f64,
    pub name: String,
    pub generic_name: Option<String>,
    pub category: Option<String>,
    pub requires_prescription: bool,
    pub price: u64,
}

impl From<SearchHit> for ResultItem {
    fn from(hit: SearchHit) -> Self {
        let r = hit.record;
        Self {
            id: hit.id,
            score: hit.score,
            name: r.name,
            generic_name: r.generic_name,
            category: r.category,
            requires_prescription: r.requires_prescription,
            price: r.price,
        }
    }
}

/// The live index. Readers take a cheap `Arc` snapshot; a reload builds the
/// replacement off to the side and swaps it in under a short write lock.
#[derive(Clone)]
pub struct SharedIndex(Arc<RwLock<Arc<SearchIndex>>>);

impl SharedIndex {
    pub fn new(index: SearchIndex) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(index))))
    }

    pub fn current(&self) -> Arc<SearchIndex> {
        self.0.read().clone()
    }

    /// Install `index` for subsequent queries and hand back the previous one.
    pub fn swap(&self, index: SearchIndex) -> Arc<SearchIndex> {
        std::mem::replace(&mut *self.0.write(), Arc::new(index))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub index: SharedIndex,
    pub index_paths_root: PathBuf,
    pub admin_token: Option<String>,
}

pub fn build_app(index_dir: String, admin_token: Option<String>) -> Result<Router> {
    // Load the persisted index at startup
    let index = load_index(&IndexPaths::new(&index_dir))?;
    tracing::info!(index_dir = %index_dir, num_docs = index.len(), "index loaded");
    let state = AppState { index: SharedIndex::new(index), index_paths_root: PathBuf::from(&index_dir), admin_token };
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:id", get(doc_handler))
        .route("/term/:term", get(term_handler))
        .route("/stats", get(stats_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub fn search_options(params: &SearchParams) -> SearchOptions {
    let mut options = SearchOptions::default().with_top_k(params.k.clamp(1, 100));
    options.filters.requires_prescription = params.rx;
    options.filters.price_range = match (params.min_price, params.max_price) {
        (None, None) => None,
        (min, max) => Some((min.unwrap_or(0), max.unwrap_or(u64::MAX))),
    };
    options.include_zero_scores = params.include_zero;
    options
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let index = state.index.current();
    let outcome = index.search(&params.q, &search_options(&params));
    let elapsed = start.elapsed();
    Json(SearchResponse {
        query: params.q,
        terms: outcome.terms,
        took_s: elapsed.as_secs_f64(),
        total_hits: outcome.total_hits,
        results: outcome.results.into_iter().map(ResultItem::from).collect(),
    })
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn not_found(what: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": format!("{what} not found") })))
}

pub async fn doc_handler(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    let index = state.index.current();
    let doc = index.document(&id).ok_or_else(|| not_found("document"))?;
    let top_terms = index.vocabulary().top_terms(&doc.vector, 10);
    Ok(Json(serde_json::json!({
        "id": doc.id(),
        "record": doc.record,
        "num_terms": doc.terms.len(),
        "top_terms": top_terms,
    })))
}

/// `term` is normalized the same way queries are before lookup.
pub async fn term_handler(State(state): State<AppState>, Path(term): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    let index = state.index.current();
    let normalized = index.normalizer().normalize(&term).into_iter().next().ok_or_else(|| not_found("term"))?;
    let info = index.term_info(&normalized).ok_or_else(|| not_found("term"))?;
    let postings = index.inverted_index().term_stats(&normalized);
    Ok(Json(serde_json::json!({ "info": info, "postings": postings })))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(state.index.current().stats()))
}

// --- Admin endpoints ---
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let root = state.index_paths_root.clone();
    let loaded = tokio::task::spawn_blocking(move || load_index(&IndexPaths::new(root)))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::warn!(error = %e, "index reload failed; keeping current index");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    let (num_docs, num_terms) = (loaded.len(), loaded.vocabulary().len());
    state.index.swap(loaded);
    tracing::info!(num_docs, num_terms, "index reloaded");
    Ok(Json(serde_json::json!({ "num_docs": num_docs, "num_terms": num_terms })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
