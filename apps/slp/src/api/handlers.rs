//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ConceptJson, ConceptResponse, ExportResponse, HealthResponse, LineageResponse,
        StatusResponse, SubmitRequest, SubmitResponse,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use slp_core::{ConceptId, LedgerMetrics, SlpError, embed_submission, records_to_bytes};

/// HTTP status for a pipeline error.
pub fn status_for_error(error: &SlpError) -> StatusCode {
    match error {
        SlpError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SlpError::EmbeddingUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SlpError::IdCollision(_) => StatusCode::CONFLICT,
        SlpError::ConceptNotFound(_) => StatusCode::NOT_FOUND,
        SlpError::DanglingParentReference(_)
        | SlpError::SerializationError(_)
        | SlpError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get ledger status.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    let metrics = LedgerMetrics::from_state(ledger.state());
    (StatusCode::OK, Json(StatusResponse::from(metrics)))
}

// =============================================================================
// SUBMIT HANDLER
// =============================================================================

/// Submit a concept.
///
/// The embedding runs on a blocking task with no lock held. The write lock
/// then covers neighbor search, persistence and insertion as one step.
pub async fn submit_handler(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> impl IntoResponse {
    let submission = match request.to_submission(crate::unix_timestamp()) {
        Ok(s) => s,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(SubmitResponse::error(format!("Invalid submission: {}", e))),
            );
        }
    };

    let embedder = state.embedder.clone();
    let params = state.params.clone();
    let to_embed = submission.clone();
    let embedded = tokio::task::spawn_blocking(move || {
        embed_submission(&to_embed, &params, embedder.as_ref())
    })
    .await;

    let embedding = match embedded {
        Ok(Ok(embedding)) => embedding,
        Ok(Err(e)) => {
            tracing::warn!(event = "embedding_failed", error = %e, "Embedding failed");
            return (
                status_for_error(&e),
                Json(SubmitResponse::error(format!("Embedding failed: {}", e))),
            );
        }
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SubmitResponse::error(format!("Embedding task failed: {}", e))),
            );
        }
    };

    let mut ledger = state.ledger.write().await;
    match ledger.admit(&submission, embedding, &state.params) {
        Ok(result) => {
            tracing::info!(
                concept_id = %result.concept.id(),
                novelty_score = result.concept.novelty_score(),
                near_duplicate = result.concept.is_near_duplicate(),
                "Concept admitted"
            );
            let concept =
                ConceptJson::from_concept(&result.concept, Some(submission.payload().to_string()));
            (
                StatusCode::OK,
                Json(SubmitResponse::success(concept, result.novelty)),
            )
        }
        Err(e) => (
            status_for_error(&e),
            Json(SubmitResponse::error(format!("Admission failed: {}", e))),
        ),
    }
}

// =============================================================================
// CONCEPT HANDLER
// =============================================================================

/// Look up one concept with its stored payload.
pub async fn concept_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = ConceptId::new(id);
    let ledger = state.ledger.read().await;

    let Some(concept) = ledger.get(&id) else {
        return (StatusCode::NOT_FOUND, Json(ConceptResponse::not_found()));
    };

    match ledger.payload(&id) {
        Ok(payload) => (
            StatusCode::OK,
            Json(ConceptResponse::found(ConceptJson::from_concept(
                concept, payload,
            ))),
        ),
        Err(e) => (
            status_for_error(&e),
            Json(ConceptResponse::error(format!("Payload lookup failed: {}", e))),
        ),
    }
}

// =============================================================================
// LINEAGE HANDLER
// =============================================================================

/// Lineage chain from a concept back to its root.
pub async fn lineage_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    let chain = ledger.lineage(&ConceptId::new(id));
    let status = if chain.is_empty() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    (status, Json(LineageResponse::with_chain(&chain)))
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Export the ledger as a base64 snapshot.
pub async fn export_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.read().await;

    let records = match ledger.records() {
        Ok(r) => r,
        Err(e) => {
            return (
                status_for_error(&e),
                Json(ExportResponse::error(format!("Failed to read records: {}", e))),
            );
        }
    };

    match records_to_bytes(&records) {
        Ok(data) => (
            StatusCode::OK,
            Json(ExportResponse::success(data, records.len())),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ExportResponse::error(format!("Export failed: {}", e))),
        ),
    }
}
