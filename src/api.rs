//! REST API server for the cost-of-living advisor
//!
//! Exposes forecasting, map markers and multi-provider consultation over HTTP

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::advisor::{Advisor, ConsultRequest, ForecastReport, ForecastRequest, MapMarker};
use crate::error::AdvisorError;
use crate::providers::ProviderRecord;

/// =============================
/// Response Wrapper
/// =============================

/// Envelope for every `/api` payload; exactly one of `data` and `error` is set
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsultResponse {
    pub forecast: ForecastReport,
    pub responses: Vec<ProviderRecord>,
}

#[derive(Debug, Deserialize)]
pub struct MapQuery {
    pub selected: Option<String>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub advisor: Arc<Advisor>,
}

fn status_for(error: &AdvisorError) -> StatusCode {
    match error {
        AdvisorError::CityNotFound(_) => StatusCode::NOT_FOUND,
        AdvisorError::InvalidHorizon { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure<T>(error: AdvisorError) -> Reply<T> {
    let status = status_for(&error);
    if status.is_server_error() {
        warn!("Request failed: {}", error);
    }
    (status, Json(ApiResponse::failed(error.to_string())))
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let logging = if state.advisor.logger().is_online() {
        "online"
    } else {
        "offline"
    };

    Json(serde_json::json!({
        "status": "healthy",
        "cities": state.advisor.dataset().len(),
        "providers": state.advisor.gateway().provider_names(),
        "logging": logging,
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Dataset Endpoints
/// =============================

async fn list_cities(State(state): State<ApiState>) -> Json<ApiResponse<Vec<String>>> {
    let names = state
        .advisor
        .dataset()
        .city_names()
        .into_iter()
        .map(String::from)
        .collect();
    Json(ApiResponse::ok(names))
}

async fn map_markers(
    State(state): State<ApiState>,
    Query(query): Query<MapQuery>,
) -> Json<ApiResponse<Vec<MapMarker>>> {
    Json(ApiResponse::ok(
        state.advisor.map_markers(query.selected.as_deref()),
    ))
}

/// =============================
/// Forecast Endpoint
/// =============================

async fn forecast(
    State(state): State<ApiState>,
    Json(req): Json<ForecastRequest>,
) -> Reply<ForecastReport> {
    info!(city = %req.city, year = req.year, "Received forecast request");

    match state.advisor.forecast(&req).await {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::ok(report))),
        Err(e) => failure(e),
    }
}

/// =============================
/// Consultation Endpoint
/// =============================

async fn consult(
    State(state): State<ApiState>,
    Json(req): Json<ConsultRequest>,
) -> Reply<ConsultResponse> {
    if req.question.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::failed("No question provided")),
        );
    }

    info!(city = %req.forecast.city, year = req.forecast.year, "Received consultation request");

    match state.advisor.consult(&req).await {
        // The log task keeps running after the handle is dropped
        Ok(consultation) => (
            StatusCode::OK,
            Json(ApiResponse::ok(ConsultResponse {
                forecast: consultation.report,
                responses: consultation
                    .outcomes
                    .iter()
                    .map(|outcome| outcome.to_record())
                    .collect(),
            })),
        ),
        Err(e) => failure(e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(advisor: Arc<Advisor>) -> Router {
    let state = ApiState { advisor };

    Router::new()
        .route("/health", get(health))
        .route("/api/cities", get(list_cities))
        .route("/api/map", get(map_markers))
        .route("/api/forecast", post(forecast))
        .route("/api/consult", post(consult))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    advisor: Arc<Advisor>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(advisor);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
