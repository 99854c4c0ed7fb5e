use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::PropertyId;
use super::engine::{MotivationEngine, MotivationError, MotivationRequest, ScoringResult};

/// Router builder exposing the scoring engine over JSON.
pub fn motivation_router(engine: Arc<MotivationEngine>) -> Router {
    Router::new()
        .route("/api/v1/motivation/score", post(score_handler))
        .route("/api/v1/motivation/batch", post(batch_handler))
        .route(
            "/api/v1/motivation/quick/:property_id",
            get(quick_handler),
        )
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchRequest {
    pub(crate) items: Vec<MotivationRequest>,
}

/// One batch slot; exactly one of `result` and `error` is set.
#[derive(Debug, Serialize)]
pub(crate) struct BatchEntry {
    pub(crate) index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) result: Option<ScoringResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchResponse {
    pub(crate) total: usize,
    pub(crate) failed: usize,
    pub(crate) items: Vec<BatchEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QuickQuery {
    #[serde(default)]
    pub(crate) force_refresh: bool,
    #[serde(default)]
    pub(crate) as_of: Option<NaiveDate>,
}

pub(crate) async fn score_handler(
    State(engine): State<Arc<MotivationEngine>>,
    axum::Json(request): axum::Json<MotivationRequest>,
) -> Response {
    match engine.calculate_seller_motivation(&request).await {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn batch_handler(
    State(engine): State<Arc<MotivationEngine>>,
    axum::Json(batch): axum::Json<BatchRequest>,
) -> Response {
    let results = engine.batch_calculate_motivation(batch.items).await;
    let total = results.len();
    let items: Vec<BatchEntry> = results
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| match outcome {
            Ok(result) => BatchEntry {
                index,
                result: Some(result),
                error: None,
            },
            Err(error) => BatchEntry {
                index,
                result: None,
                error: Some(error.to_string()),
            },
        })
        .collect();
    let failed = items.iter().filter(|entry| entry.error.is_some()).count();

    (
        StatusCode::OK,
        axum::Json(BatchResponse {
            total,
            failed,
            items,
        }),
    )
        .into_response()
}

pub(crate) async fn quick_handler(
    State(engine): State<Arc<MotivationEngine>>,
    Path(property_id): Path<String>,
    Query(query): Query<QuickQuery>,
) -> Response {
    let request = MotivationRequest {
        property_id: Some(PropertyId(property_id)),
        force_refresh: query.force_refresh,
        as_of: query.as_of,
        ..MotivationRequest::default()
    };
    match engine.quick_score(request).await {
        Ok(quick) => (StatusCode::OK, axum::Json(quick)).into_response(),
        Err(error) => error_response(&error),
    }
}

fn error_response(error: &MotivationError) -> Response {
    let status = match error {
        MotivationError::UnresolvableIdentity { .. } => StatusCode::NOT_FOUND,
        MotivationError::MissingIdentity | MotivationError::InvalidInput(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
