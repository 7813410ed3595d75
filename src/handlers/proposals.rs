//! Proposal management HTTP handlers.
//!
//! This module implements the owner-side proposal endpoints:
//! - POST /api/v1/proposals - Create a draft proposal
//! - GET /api/v1/proposals - List proposals for the authenticated key
//! - GET /api/v1/proposals/{id} - Get one proposal
//! - PATCH /api/v1/proposals/{id} - Partially update a proposal
//! - DELETE /api/v1/proposals/{id} - Archive a proposal

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        proposal::{CreateProposalRequest, ProposalResponse, UpdateProposalRequest},
        usage_event::{NewUsageEvent, UsageEventType},
    },
    services::{proposal_service, usage_service},
};

/// Create a new proposal.
///
/// # Request Body
///
/// ```json
/// {
///   "title": "Website redesign",
///   "client_name": "Globex",
///   "total_cents": 1250000
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: Returns the created proposal in `draft` status
/// - **Error (400)**: Validation failed
/// - **Error (401)**: Invalid API key
/// - **Error (429)**: Rate limit exceeded
pub async fn create_proposal(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateProposalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let proposal = proposal_service::create_proposal(&pool, auth.api_key_id, request).await?;

    tracing::info!(
        proposal_id = %proposal.id,
        key_name = %auth.key_name,
        "proposal created"
    );

    usage_service::record_event_detached(
        &pool,
        NewUsageEvent::for_proposal(auth.api_key_id, proposal.id, UsageEventType::ProposalCreated),
    );

    Ok((StatusCode::CREATED, Json(ProposalResponse::from(proposal))))
}

/// List all proposals of the authenticated key, newest first. Archived ones are omitted.
pub async fn list_proposals(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ProposalResponse>>, AppError> {
    let proposals = proposal_service::list_proposals(&pool, auth.api_key_id).await?;

    Ok(Json(proposals.into_iter().map(Into::into).collect()))
}

/// Get a proposal by ID.
///
/// Returns 404 if the proposal doesn't exist, is archived, or belongs to a
/// different key.
pub async fn get_proposal(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<ProposalResponse>, AppError> {
    let proposal = proposal_service::get_proposal(&pool, auth.api_key_id, proposal_id).await?;

    Ok(Json(proposal.into()))
}

pub async fn update_proposal(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(proposal_id): Path<Uuid>,
    Json(request): Json<UpdateProposalRequest>,
) -> Result<Json<ProposalResponse>, AppError> {
    let new_status = request.status;
    let proposal =
        proposal_service::update_proposal(&pool, auth.api_key_id, proposal_id, request).await?;

    let mut event =
        NewUsageEvent::for_proposal(auth.api_key_id, proposal.id, UsageEventType::ProposalUpdated);
    if let Some(status) = new_status {
        event = event.with_metadata(json!({ "status": status.as_str() }));
    }
    usage_service::record_event_detached(&pool, event);

    Ok(Json(proposal.into()))
}

/// Archive a proposal.
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (404)**: Not found, already archived, or owned by another key
pub async fn archive_proposal(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(proposal_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    proposal_service::archive_proposal(&pool, auth.api_key_id, proposal_id).await?;

    tracing::info!(%proposal_id, key_name = %auth.key_name, "proposal archived");

    usage_service::record_event_detached(
        &pool,
        NewUsageEvent::for_proposal(auth.api_key_id, proposal_id, UsageEventType::ProposalArchived),
    );

    Ok(StatusCode::NO_CONTENT)
}
