use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    CategoryCode, ManualEntry, NutritionRecord, ProductCode, Provenance, WellnessResult,
};
use super::repository::{NutritionRepository, ScanEvent, ScanLog};
use super::service::{PipelineError, WellnessPipeline};

/// Shared state for the scan endpoints.
pub struct ScanState<R, L> {
    pub pipeline: Arc<WellnessPipeline<R>>,
    pub scans: Arc<L>,
}

impl<R, L> Clone for ScanState<R, L> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            scans: self.scans.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanQuery {
    pub food_cat: String,
}

/// Body returned to the scanner app.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse {
    pub product: Option<NutritionRecord>,
    pub wellness: Option<&'static str>,
    pub response: &'static str,
    pub message: String,
    pub provenance: Provenance,
}

impl From<WellnessResult> for ScanResponse {
    fn from(result: WellnessResult) -> Self {
        Self {
            message: result.provenance.message(),
            wellness: Some(result.verdict.label()),
            response: "success",
            provenance: result.provenance,
            product: Some(result.record),
        }
    }
}

/// Router builder exposing the scan and lookup endpoints.
pub fn scan_router<R, L>(pipeline: Arc<WellnessPipeline<R>>, scans: Arc<L>) -> Router
where
    R: NutritionRepository + 'static,
    L: ScanLog + 'static,
{
    Router::new()
        .route(
            "/scan/:code",
            get(scan_handler::<R, L>).post(manual_entry_handler::<R, L>),
        )
        .route("/api/v1/upc/:code", get(product_handler::<R, L>))
        .route("/api/v1/foodcat", get(categories_handler::<R, L>))
        .with_state(ScanState { pipeline, scans })
}

pub(crate) async fn scan_handler<R, L>(
    State(state): State<ScanState<R, L>>,
    Path(code): Path<String>,
    Query(query): Query<ScanQuery>,
) -> Response
where
    R: NutritionRepository + 'static,
    L: ScanLog + 'static,
{
    let code = ProductCode(code);
    let category = CategoryCode(query.food_cat);
    let outcome = state.pipeline.evaluate(&code, &category).await;
    respond(&state, code, category, outcome)
}

pub(crate) async fn manual_entry_handler<R, L>(
    State(state): State<ScanState<R, L>>,
    Path(code): Path<String>,
    Query(query): Query<ScanQuery>,
    Json(entry): Json<ManualEntry>,
) -> Response
where
    R: NutritionRepository + 'static,
    L: ScanLog + 'static,
{
    let code = ProductCode(code);
    let category = CategoryCode(query.food_cat);
    let outcome = state.pipeline.submit_manual(&code, &category, entry).await;
    respond(&state, code, category, outcome)
}

pub(crate) async fn product_handler<R, L>(
    State(state): State<ScanState<R, L>>,
    Path(code): Path<String>,
) -> Response
where
    R: NutritionRepository + 'static,
    L: ScanLog + 'static,
{
    match state.pipeline.record(&ProductCode(code)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn categories_handler<R, L>(State(state): State<ScanState<R, L>>) -> Response
where
    R: NutritionRepository + 'static,
    L: ScanLog + 'static,
{
    match state.pipeline.categories() {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(err) => error_response(err),
    }
}

fn respond<R, L>(
    state: &ScanState<R, L>,
    code: ProductCode,
    category: CategoryCode,
    outcome: Result<WellnessResult, PipelineError>,
) -> Response
where
    R: NutritionRepository + 'static,
    L: ScanLog + 'static,
{
    let status = match &outcome {
        Ok(result) => result.provenance.message(),
        Err(err) => err.to_string(),
    };
    let event = ScanEvent {
        code,
        category,
        status,
        recorded_at: Utc::now(),
    };
    if let Err(err) = state.scans.record(event) {
        tracing::warn!(error = %err, "failed to record scan event");
    }

    match outcome {
        Ok(result) => (StatusCode::OK, Json(ScanResponse::from(result))).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: PipelineError) -> Response {
    match err {
        PipelineError::DataUnresolved { .. } => {
            let payload = ScanResponse {
                product: None,
                wellness: None,
                response: "error",
                message: Provenance::Unresolved.message(),
                provenance: Provenance::Unresolved,
            };
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        PipelineError::CategoryNotFound(_) | PipelineError::RuleNotFound(_) => {
            let payload = json!({
                "response": "error",
                "message": err.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        PipelineError::Repository(_) => {
            let payload = json!({
                "response": "error",
                "message": err.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
