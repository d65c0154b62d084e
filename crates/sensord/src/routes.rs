//! API routes for sensord

use crate::auth;
use crate::error::ApiError;
use crate::server::AppStateArc;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use sensor_common::{
    merge, Account, FilterSelection, ProbeStatus, Site, SiteSummary, StatusSummary, Table,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Sign-up form for the login page's Register link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_url: Option<String>,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        register_url: Some(state.config.sources.register_url.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string),
    })
}

// ============================================================================
// Auth Routes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub username: String,
    pub name: String,
    pub role: String,
}

impl From<Account> for UserResponse {
    fn from(a: Account) -> Self {
        Self {
            username: a.username,
            name: a.name,
            role: a.role,
        }
    }
}

pub fn auth_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/login", post(login))
        .route("/v1/logout", post(logout))
        .route("/v1/session", get(session))
        .route("/v1/accounts", get(list_accounts))
}

async fn login(
    State(state): State<AppStateArc>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = auth::login(&state, &req.username, &req.password).await?;
    let cookie = state.cookie.issue(&account.username, Utc::now());
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(UserResponse::from(account)),
    ))
}

async fn logout(State(state): State<AppStateArc>) -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, state.cookie.clear())]),
        Json(serde_json::json!({ "logged_out": true })),
    )
}

async fn session(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ApiError> {
    let account = auth::current_user(&state, &headers).await?;
    Ok(Json(account.into()))
}

async fn list_accounts(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    auth::require_admin(&state, &headers).await?;
    let book = state.load_accounts().await;
    Ok(Json(
        book.accounts().iter().cloned().map(UserResponse::from).collect(),
    ))
}

// ============================================================================
// Site Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SitesResponse {
    pub sites: Vec<SiteMarker>,
    pub summary: SiteSummary,
    pub editable: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SiteMarker {
    #[serde(flatten)]
    pub site: Site,
    pub color: String,
}

pub fn site_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/sites", get(get_sites).put(put_sites))
}

async fn sites_response(state: &AppState, editable: bool) -> SitesResponse {
    let sites = state.sites.read().await;
    SitesResponse {
        sites: sites
            .sites()
            .iter()
            .map(|s| SiteMarker {
                site: s.clone(),
                color: s.marker_color().to_string(),
            })
            .collect(),
        summary: sites.summary(),
        editable,
    }
}

async fn get_sites(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
) -> Result<Json<SitesResponse>, ApiError> {
    let account = auth::current_user(&state, &headers).await?;
    Ok(Json(sites_response(&state, account.is_admin()).await))
}

async fn put_sites(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    Json(sites): Json<Vec<Site>>,
) -> Result<Json<SitesResponse>, ApiError> {
    let admin = auth::require_admin(&state, &headers).await?;
    state.sites.write().await.replace(sites)?;
    info!("  Site table saved by {}", admin.username);
    Ok(Json(sites_response(&state, true).await))
}

// ============================================================================
// Sensor Routes
// ============================================================================

pub const NO_DATA_MESSAGE: &str = "No data yet, please retry";

#[derive(Debug, Serialize, Deserialize)]
pub struct SensorView {
    pub source: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Counts over the whole table, before filtering
    pub summary: StatusSummary,
    pub shown: usize,
    /// Every observed value per filterable column, for the filter widgets
    pub filters: FilterSelection,
    pub probed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn sensor_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/sensors", get(get_sensors))
        .route("/v1/sensors/probe", post(probe_sensors))
}

/// `?getStatusAPI=Good,Bad&Floor=1` → selection. Unknown keys are kept and
/// simply never match a column.
fn selection_from_query(query: &HashMap<String, String>) -> FilterSelection {
    let mut selection = FilterSelection::new();
    for (column, raw) in query {
        let values: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        selection.set(column, values);
    }
    selection
}

fn build_view(
    state: &AppState,
    table: &Table,
    results: Option<&[ProbeStatus]>,
    probed_at: Option<DateTime<Utc>>,
    selection: &FilterSelection,
) -> Result<SensorView, ApiError> {
    let merged = merge(table, results, &state.config.probe.status_column)?;
    let filters = FilterSelection::observed(&merged, &state.config.probe.filterable_columns());
    let shown = merged.filter(selection);

    Ok(SensorView {
        source: state.sensor_source().describe(),
        rows: shown.rows.iter().map(|r| shown.cells(r)).collect(),
        shown: shown.len(),
        columns: merged.columns.clone(),
        summary: merged.summary(),
        filters,
        probed_at,
        message: table.is_empty().then(|| NO_DATA_MESSAGE.to_string()),
    })
}

async fn get_sensors(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<SensorView>, ApiError> {
    auth::current_user(&state, &headers).await?;

    let table = state.current_table().await;
    let cache = state.sensors.read().await;
    let (results, probed_at) = cache.results_for(&table);

    let view = build_view(&state, &table, results, probed_at, &selection_from_query(&query))?;
    Ok(Json(view))
}

async fn probe_sensors(
    State(state): State<AppStateArc>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<SensorView>, ApiError> {
    let account = auth::current_user(&state, &headers).await?;
    let table = state.current_table().await;

    info!("  Probe cycle requested by {} ({} rows)", account.username, table.len());
    let results = state.prober.probe_all(&table.probe_targets()).await;

    let view = build_view(&state, &table, Some(&results), Some(Utc::now()), &selection_from_query(&query))?;
    state.sensors.write().await.store_results(table, results);
    Ok(Json(view))
}
