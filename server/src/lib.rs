use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use catalog_core::{
    Catalog, CatalogError, CategoryKeywords, DocId, Document, FixtureSource, KeywordCount, RawRecord, SearchHit,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// When set, ingestion requires a matching `X-ADMIN-TOKEN` header.
    pub admin_token: Option<String>,
    /// Comma-separated allowed origins; any origin when unset or empty.
    pub cors_allow_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            admin_token: std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty()),
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    /// Consulted when a scrape request carries no record of its own.
    pub source: Arc<FixtureSource>,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default)]
    pub record: Option<RawRecord>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_allow_origin
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    }
}

pub fn build_app(catalog: Arc<Catalog>, source: FixtureSource, config: AppConfig) -> Router {
    let cors = cors_layer(&config);
    let state = AppState { catalog, source: Arc::new(source), admin_token: config.admin_token };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/games", get(list_handler))
        .route("/api/games/scrape", post(scrape_handler))
        .route("/api/games/search", get(search_handler))
        .route("/api/games/:id", get(doc_handler))
        .route("/api/statistics/top-keywords", get(top_keywords_handler))
        .route("/api/statistics/top-keywords-by-genre", get(top_keywords_by_category_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub fn error_response(err: CatalogError) -> ApiError {
    let status = match &err {
        CatalogError::InvalidSource(_) => StatusCode::BAD_REQUEST,
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::ExtractionFailure(_) => StatusCode::BAD_GATEWAY,
        CatalogError::Corrupt(_) | CatalogError::Storage(_) | CatalogError::Codec(_) => {
            tracing::error!(%err, "catalog failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": err.to_string() })))
}

pub async fn list_handler(State(state): State<AppState>) -> ApiResult<Vec<Document>> {
    state.catalog.list_all().map(Json).map_err(error_response)
}

pub async fn doc_handler(State(state): State<AppState>, Path(id): Path<DocId>) -> ApiResult<Document> {
    state.catalog.get(id).map(Json).map_err(error_response)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResult<Vec<SearchHit>> {
    let start = std::time::Instant::now();
    let mut hits = state.catalog.search_scored(&params.query).map_err(error_response)?;
    if let Some(limit) = params.limit {
        hits.truncate(limit);
    }
    tracing::info!(query = %params.query, hits = hits.len(), took_s = start.elapsed().as_secs_f64(), "search");
    Ok(Json(hits))
}

/// Ingestion runs on the blocking pool and completes even if the client goes away.
pub async fn scrape_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ScrapeRequest>,
) -> ApiResult<Document> {
    authorize(&state, &headers)?;
    let catalog = Arc::clone(&state.catalog);
    let source = Arc::clone(&state.source);
    let result = tokio::task::spawn_blocking(move || match req.record {
        Some(record) => catalog.ingest(&req.url, record),
        None => catalog.scrape(&req.url, source.as_ref()),
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))))?;
    result.map(Json).map_err(error_response)
}

pub async fn top_keywords_handler(State(state): State<AppState>) -> ApiResult<Vec<KeywordCount>> {
    state.catalog.top_keywords().map(Json).map_err(error_response)
}

pub async fn top_keywords_by_category_handler(State(state): State<AppState>) -> ApiResult<Vec<CategoryKeywords>> {
    state.catalog.top_keywords_by_category().map(Json).map_err(error_response)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(required) = &state.admin_token else { return Ok(()) };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid admin token" }))))
    }
}
