//! HTTP/JSON API consumed by the browser UI.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use gizmo_flight::{BackendConnector, ConnectConfig};
use gizmo_query::{run_query, sql_type_name, QueryOutcome, DEFAULT_LIMIT};
use gizmo_session::SessionRegistry;

use crate::error::ApiError;

/// Application state shared across handlers.
pub struct AppState {
    pub registry: SessionRegistry,
    pub connector: Box<dyn BackendConnector>,
}

/// Build the API router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/connect", post(connect))
        .route("/api/disconnect", post(disconnect))
        .route("/api/query", post(query))
        .route("/api/catalogs", get(list_catalogs))
        .route("/api/schemas", get(list_schemas))
        .route("/api/tables", get(list_tables))
        .route("/api/columns", get(list_columns))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health ===

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// === Connect / disconnect ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectRequest {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    use_tls: Option<bool>,
    skip_tls_verify: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectResponse {
    success: bool,
    session_id: String,
    message: String,
}

async fn connect(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<ConnectResponse>, ApiError> {
    let host = req
        .host
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("host is required".to_string()))?;

    let mut config = ConnectConfig::new(host);
    if let Some(port) = req.port {
        config.port = port;
    }
    config.username = req.username;
    config.password = req.password;
    if let Some(use_tls) = req.use_tls {
        config.use_tls = use_tls;
    }
    if let Some(skip) = req.skip_tls_verify {
        config.skip_tls_verify = skip;
    }

    // A failed connect inserts nothing; the registry only ever sees
    // verified backends.
    let backend = state
        .connector
        .connect(&config)
        .await
        .map_err(|e| ApiError::Connection(e.to_string()))?;
    let session = state.registry.insert(backend).await;

    Ok(Json(ConnectResponse {
        success: true,
        session_id: session.id().to_string(),
        message: format!("Connected to {}", config.endpoint()),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisconnectRequest {
    session_id: Option<String>,
}

#[derive(Serialize)]
struct DisconnectResponse {
    success: bool,
}

async fn disconnect(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DisconnectRequest>,
) -> Result<Json<DisconnectResponse>, ApiError> {
    let session_id = req
        .session_id
        .ok_or_else(|| ApiError::InvalidRequest("sessionId is required".to_string()))?;

    // Unknown ids are fine; disconnect is idempotent.
    if let Some(session) = state.registry.remove(&session_id).await {
        let mut backend = session.backend().lock().await;
        backend
            .close()
            .await
            .map_err(|e| ApiError::Connection(e.to_string()))?;
        info!(session_id = %session_id, "disconnected");
    }

    Ok(Json(DisconnectResponse { success: true }))
}

// === Query ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    session_id: Option<String>,
    sql: Option<String>,
    /// Arbitrary JSON on purpose: only numeric values are honored, anything
    /// else falls back to the default for that field alone.
    limit: Option<Value>,
    offset: Option<Value>,
}

fn numeric_or(value: Option<&Value>, default: usize) -> usize {
    // Floats count as numeric and truncate; negative or non-numeric
    // values fall back to the default.
    value
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as usize)
        .unwrap_or(default)
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryOutcome>, ApiError> {
    let session_id = req
        .session_id
        .ok_or_else(|| ApiError::InvalidRequest("sessionId is required".to_string()))?;
    let sql = req
        .sql
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("sql is required".to_string()))?;

    let limit = numeric_or(req.limit.as_ref(), DEFAULT_LIMIT);
    let offset = numeric_or(req.offset.as_ref(), 0);

    let session = state.registry.lookup(&session_id).await?;
    let mut backend = session.backend().lock().await;
    let outcome = run_query(backend.as_mut(), sql, limit, offset).await?;

    Ok(Json(outcome))
}

// === Metadata ===

fn session_id_header(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("X-Session-Id header is required".to_string()))
}

#[derive(Deserialize)]
struct MetadataParams {
    catalog: Option<String>,
    schema: Option<String>,
    table: Option<String>,
}

#[derive(Serialize)]
struct CatalogsResponse {
    catalogs: Vec<String>,
}

async fn list_catalogs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CatalogsResponse>, ApiError> {
    let session = state.registry.lookup(session_id_header(&headers)?).await?;
    let mut backend = session.backend().lock().await;
    let catalogs = backend.list_catalogs().await?;
    Ok(Json(CatalogsResponse { catalogs }))
}

#[derive(Serialize)]
struct SchemaItem {
    catalog: Option<String>,
    schema: String,
}

#[derive(Serialize)]
struct SchemasResponse {
    schemas: Vec<SchemaItem>,
}

async fn list_schemas(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<MetadataParams>,
) -> Result<Json<SchemasResponse>, ApiError> {
    let session = state.registry.lookup(session_id_header(&headers)?).await?;
    let mut backend = session.backend().lock().await;
    let schemas = backend
        .list_schemas(params.catalog.as_deref())
        .await?
        .into_iter()
        .map(|entry| SchemaItem {
            catalog: entry.catalog,
            schema: entry.schema,
        })
        .collect();
    Ok(Json(SchemasResponse { schemas }))
}

#[derive(Serialize)]
struct TableItem {
    catalog: Option<String>,
    schema: Option<String>,
    name: String,
    #[serde(rename = "type")]
    table_type: String,
}

#[derive(Serialize)]
struct TablesResponse {
    tables: Vec<TableItem>,
}

async fn list_tables(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<MetadataParams>,
) -> Result<Json<TablesResponse>, ApiError> {
    let session = state.registry.lookup(session_id_header(&headers)?).await?;
    let mut backend = session.backend().lock().await;
    let tables = backend
        .list_tables(params.catalog.as_deref(), params.schema.as_deref())
        .await?
        .into_iter()
        .map(|entry| TableItem {
            catalog: entry.catalog,
            schema: entry.schema,
            name: entry.name,
            table_type: entry.table_type,
        })
        .collect();
    Ok(Json(TablesResponse { tables }))
}

#[derive(Serialize)]
struct ColumnItem {
    catalog: Option<String>,
    schema: Option<String>,
    table: String,
    name: String,
    #[serde(rename = "type")]
    sql_type: String,
    position: usize,
}

#[derive(Serialize)]
struct ColumnsResponse {
    columns: Vec<ColumnItem>,
}

async fn list_columns(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<MetadataParams>,
) -> Result<Json<ColumnsResponse>, ApiError> {
    let session = state.registry.lookup(session_id_header(&headers)?).await?;
    let mut backend = session.backend().lock().await;
    let columns = backend
        .list_columns(
            params.catalog.as_deref(),
            params.schema.as_deref(),
            params.table.as_deref(),
        )
        .await?
        .into_iter()
        .map(|entry| ColumnItem {
            catalog: entry.catalog,
            schema: entry.schema,
            table: entry.table,
            name: entry.name,
            sql_type: sql_type_name(&entry.data_type),
            position: entry.position,
        })
        .collect();
    Ok(Json(ColumnsResponse { columns }))
}
