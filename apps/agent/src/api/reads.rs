//! Domain read surfaces.
//!
//! Every route takes `(customer_id, provider)` path segments plus an
//! optional window, and returns rows, hourly trends, or aggregates. All
//! reads go through the domain readers, which sanitize non-finite floats
//! before anything reaches the wire.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use domain_telemetry::{
    ApplicationReader, CloudProvider, CostReader, PerformanceReader, ResourceReader,
    TelemetryError, TelemetryResult, TimeWindow,
};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::state::AppState;

const DEFAULT_WINDOW_HOURS: i64 = 24;
const DEFAULT_LIMIT: u64 = 100;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReadQuery {
    pub hours: Option<i64>,
    pub limit: Option<u64>,
    /// Metric name (performance/resource trends) or metric type
    /// (application)
    pub metric: Option<String>,
    /// Resource id for resource `latest`
    pub resource_id: Option<String>,
}

impl ReadQuery {
    fn window(&self) -> TimeWindow {
        TimeWindow::last_hours(self.hours.unwrap_or(DEFAULT_WINDOW_HOURS))
    }

    fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    fn metric(&self, default: &str) -> String {
        self.metric.clone().unwrap_or_else(|| default.to_string())
    }
}

type PathPair = Path<(Uuid, CloudProvider)>;

// ---------------------------------------------------------------- cost

pub fn cost_router() -> Router<AppState> {
    Router::new()
        .route("/{customer_id}/{provider}/metrics", get(cost_metrics))
        .route("/{customer_id}/{provider}/trends", get(cost_trends))
        .route("/{customer_id}/{provider}/latest", get(cost_latest))
        .route("/{customer_id}/{provider}/total", get(cost_total))
        .route("/{customer_id}/{provider}/summary", get(cost_summary))
}

async fn cost_metrics(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let metrics = state
        .cost_reader
        .list_metrics(customer_id, provider, query.window(), query.limit())
        .await?;
    Ok(Json(json!({
        "metric_count": metrics.len(),
        "metrics": metrics,
    })))
}

async fn cost_trends(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let trend = state
        .cost_reader
        .hourly_trend(customer_id, provider, query.window())
        .await?;
    Ok(Json(json!({ "trend": trend })))
}

async fn cost_latest(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
) -> TelemetryResult<Json<Value>> {
    let latest = state
        .cost_reader
        .latest(customer_id, provider)
        .await?
        .ok_or_else(|| TelemetryError::NotFound(format!("{customer_id}/{provider}")))?;
    Ok(Json(json!(latest)))
}

async fn cost_total(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let total = state
        .cost_reader
        .total_cost(customer_id, provider, query.window())
        .await?;
    Ok(Json(json!({ "total_cost": total })))
}

async fn cost_summary(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let summary = state
        .cost_reader
        .summary(customer_id, provider, query.window())
        .await?;
    Ok(Json(json!(summary)))
}

// --------------------------------------------------------- performance

pub fn performance_router() -> Router<AppState> {
    Router::new()
        .route("/{customer_id}/{provider}/metrics", get(performance_metrics))
        .route("/{customer_id}/{provider}/trends", get(performance_trends))
        .route("/{customer_id}/{provider}/latest", get(performance_latest))
        .route("/{customer_id}/{provider}/summary", get(performance_summary))
}

async fn performance_metrics(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let metrics = state
        .performance_reader
        .list_metrics(customer_id, provider, query.window(), query.limit())
        .await?;
    Ok(Json(json!({
        "metric_count": metrics.len(),
        "metrics": metrics,
    })))
}

async fn performance_trends(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let trend = state
        .performance_reader
        .hourly_trend(
            customer_id,
            provider,
            query.metric("cpu_utilization"),
            query.window(),
        )
        .await?;
    Ok(Json(json!({ "trend": trend })))
}

async fn performance_latest(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let latest = state
        .performance_reader
        .latest(customer_id, provider, query.metric("cpu_utilization"))
        .await?
        .ok_or_else(|| TelemetryError::NotFound(format!("{customer_id}/{provider}")))?;
    Ok(Json(json!(latest)))
}

async fn performance_summary(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let summary = state
        .performance_reader
        .summary(customer_id, provider, query.window())
        .await?;
    Ok(Json(json!(summary)))
}

// ------------------------------------------------------------ resource

pub fn resource_router() -> Router<AppState> {
    Router::new()
        .route("/{customer_id}/{provider}/metrics", get(resource_metrics))
        .route("/{customer_id}/{provider}/trends", get(resource_trends))
        .route("/{customer_id}/{provider}/latest", get(resource_latest))
        .route("/{customer_id}/{provider}/summary", get(resource_summary))
}

async fn resource_metrics(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let metrics = state
        .resource_reader
        .list_metrics(customer_id, provider, query.window(), query.limit())
        .await?;
    Ok(Json(json!({
        "metric_count": metrics.len(),
        "metrics": metrics,
    })))
}

async fn resource_trends(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let trend = state
        .resource_reader
        .hourly_trend(
            customer_id,
            provider,
            query.metric("cpu_utilization"),
            query.window(),
        )
        .await?;
    Ok(Json(json!({ "trend": trend })))
}

async fn resource_latest(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let resource_id = query.resource_id.clone().ok_or_else(|| {
        TelemetryError::InvalidInput("resource_id query parameter required".to_string())
    })?;

    let latest = state
        .resource_reader
        .latest(customer_id, provider, resource_id)
        .await?
        .ok_or_else(|| TelemetryError::NotFound(format!("{customer_id}/{provider}")))?;
    Ok(Json(json!(latest)))
}

async fn resource_summary(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let summary = state
        .resource_reader
        .summary(customer_id, provider, query.window())
        .await?;
    Ok(Json(json!(summary)))
}

// --------------------------------------------------------- application

pub fn application_router() -> Router<AppState> {
    Router::new()
        .route("/{customer_id}/{provider}/metrics", get(application_metrics))
        .route("/{customer_id}/{provider}/trends", get(application_trends))
        .route("/{customer_id}/{provider}/latest", get(application_latest))
        .route("/{customer_id}/{provider}/summary", get(application_summary))
}

async fn application_metrics(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let metrics = state
        .application_reader
        .list_metrics(customer_id, provider, query.window(), query.limit())
        .await?;
    Ok(Json(json!({
        "metric_count": metrics.len(),
        "metrics": metrics,
    })))
}

async fn application_trends(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let trend = state
        .application_reader
        .hourly_trend(customer_id, provider, query.metric("quality"), query.window())
        .await?;
    Ok(Json(json!({ "trend": trend })))
}

async fn application_latest(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let latest = state
        .application_reader
        .latest(customer_id, provider, query.metric("quality"))
        .await?
        .ok_or_else(|| TelemetryError::NotFound(format!("{customer_id}/{provider}")))?;
    Ok(Json(json!(latest)))
}

async fn application_summary(
    State(state): State<AppState>,
    Path((customer_id, provider)): PathPair,
    Query(query): Query<ReadQuery>,
) -> TelemetryResult<Json<Value>> {
    let summary = state
        .application_reader
        .summary(customer_id, provider, query.window())
        .await?;
    Ok(Json(json!(summary)))
}
