//! HTTP Handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use risk_advisor::{PortfolioSnapshot, RiskAssessment, RiskError, RiskReport};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub rules: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn validation_error(e: &RiskError) -> ApiError {
    tracing::warn!("Rejected snapshot: {}", e);
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            error: e.user_message(),
            code: "INVALID_SNAPSHOT".into(),
        }),
    )
}

fn snapshot_label(snapshot: &PortfolioSnapshot) -> &str {
    snapshot.address.as_deref().unwrap_or("<missing>")
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        rules: state.rules_source.to_string(),
    })
}

/// Score a portfolio snapshot.
///
/// Invalid snapshots get a 422. Engine failures are scoped to this request
/// and come back as a degraded assessment.
pub async fn analyze(
    State(state): State<AppState>,
    Json(snapshot): Json<PortfolioSnapshot>,
) -> Result<Json<RiskAssessment>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("analyze", %request_id, address = snapshot_label(&snapshot));

    span.in_scope(|| {
        tracing::info!("Received risk request");
        match state.engine.try_assess(&snapshot) {
            Ok(assessment) => Ok(Json(assessment)),
            Err(e) if e.is_validation() => Err(validation_error(&e)),
            Err(e) => {
                tracing::error!("Risk evaluation failed: {}", e);
                Ok(Json(RiskAssessment::degraded(&e)))
            }
        }
    })
}

/// Score a snapshot and return the metrics and factors behind the score
pub async fn analyze_report(
    State(state): State<AppState>,
    Json(snapshot): Json<PortfolioSnapshot>,
) -> Result<Json<RiskReport>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("report", %request_id, address = snapshot_label(&snapshot));

    span.in_scope(|| match state.engine.report(&snapshot) {
        Ok(report) => Ok(Json(report)),
        Err(e) if e.is_validation() => Err(validation_error(&e)),
        Err(e) => {
            tracing::error!("Risk evaluation failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.user_message(),
                    code: "EVALUATION_FAILED".into(),
                }),
            ))
        }
    })
}
