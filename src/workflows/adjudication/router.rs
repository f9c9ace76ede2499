use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::ClaimId;
use super::repository::{ClaimRepository, RepositoryError, RuleDocumentRepository};
use super::rules::RuleCategory;
use super::service::{AdjudicationError, AdjudicationService, RuleSubmission};

/// Router builder exposing HTTP endpoints for claim ingestion, rule upload,
/// and validation runs.
pub fn adjudication_router<C, R>(service: Arc<AdjudicationService<C, R>>) -> Router
where
    C: ClaimRepository + 'static,
    R: RuleDocumentRepository + 'static,
{
    Router::new()
        .route("/api/v1/claims", get(claims_handler::<C, R>))
        .route("/api/v1/claims/import", post(import_claims_handler::<C, R>))
        .route("/api/v1/claims/validate", post(validate_handler::<C, R>))
        .route("/api/v1/claims/breakdown", get(breakdown_handler::<C, R>))
        .route("/api/v1/claims/:claim_id", get(claim_handler::<C, R>))
        .route(
            "/api/v1/rules",
            get(rules_handler::<C, R>).post(upload_rules_handler::<C, R>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RuleUploadRequest {
    pub(crate) name: String,
    pub(crate) category: RuleCategory,
    /// Pre-structured rule list, passed through untouched.
    #[serde(default)]
    pub(crate) rules: Option<Vec<Value>>,
    /// Raw document text, run through the extractor.
    #[serde(default)]
    pub(crate) text: Option<String>,
}

pub(crate) async fn import_claims_handler<C, R>(
    State(service): State<Arc<AdjudicationService<C, R>>>,
    body: String,
) -> Response
where
    C: ClaimRepository + 'static,
    R: RuleDocumentRepository + 'static,
{
    match service.ingest_claims(body.as_bytes()) {
        Ok(ids) => {
            let payload = json!({ "imported": ids.len(), "claim_ids": ids });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(AdjudicationError::ClaimImport(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(AdjudicationError::Repository(RepositoryError::Conflict)) => {
            let payload = json!({ "error": "claim already exists" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => internal_error(other),
    }
}

pub(crate) async fn upload_rules_handler<C, R>(
    State(service): State<Arc<AdjudicationService<C, R>>>,
    axum::Json(request): axum::Json<RuleUploadRequest>,
) -> Response
where
    C: ClaimRepository + 'static,
    R: RuleDocumentRepository + 'static,
{
    let submission = match (request.rules, request.text) {
        (Some(rules), _) => RuleSubmission::Structured(json!({
            "type": request.category.label(),
            "rules": rules,
        })),
        (None, Some(text)) => RuleSubmission::Text(text),
        (None, None) => RuleSubmission::Unsupported,
    };

    match service.upload_rules(&request.name, request.category, submission) {
        Ok(view) => {
            let payload = json!({
                "name": view.name,
                "category": view.category,
                "entries": view.entries.len(),
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(error) => internal_error(error),
    }
}

pub(crate) async fn validate_handler<C, R>(
    State(service): State<Arc<AdjudicationService<C, R>>>,
) -> Response
where
    C: ClaimRepository + 'static,
    R: RuleDocumentRepository + 'static,
{
    match service.run_validation() {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => internal_error(error),
    }
}

pub(crate) async fn claims_handler<C, R>(
    State(service): State<Arc<AdjudicationService<C, R>>>,
) -> Response
where
    C: ClaimRepository + 'static,
    R: RuleDocumentRepository + 'static,
{
    match service.claim_results() {
        Ok(claims) => (StatusCode::OK, axum::Json(claims)).into_response(),
        Err(error) => internal_error(error),
    }
}

pub(crate) async fn claim_handler<C, R>(
    State(service): State<Arc<AdjudicationService<C, R>>>,
    Path(claim_id): Path<String>,
) -> Response
where
    C: ClaimRepository + 'static,
    R: RuleDocumentRepository + 'static,
{
    let id = ClaimId(claim_id);
    match service.claim(&id) {
        Ok(claim) => (StatusCode::OK, axum::Json(claim)).into_response(),
        Err(AdjudicationError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({ "error": "claim not found", "claim_id": id.0 });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error) => internal_error(error),
    }
}

pub(crate) async fn rules_handler<C, R>(
    State(service): State<Arc<AdjudicationService<C, R>>>,
) -> Response
where
    C: ClaimRepository + 'static,
    R: RuleDocumentRepository + 'static,
{
    match service.rule_summary() {
        Ok(documents) => (StatusCode::OK, axum::Json(documents)).into_response(),
        Err(error) => internal_error(error),
    }
}

pub(crate) async fn breakdown_handler<C, R>(
    State(service): State<Arc<AdjudicationService<C, R>>>,
) -> Response
where
    C: ClaimRepository + 'static,
    R: RuleDocumentRepository + 'static,
{
    match service.error_breakdown() {
        Ok(breakdown) => (StatusCode::OK, axum::Json(breakdown)).into_response(),
        Err(error) => internal_error(error),
    }
}

fn internal_error(error: AdjudicationError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
