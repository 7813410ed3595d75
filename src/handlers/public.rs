//! Public proposal viewer.
//!
//! These routes are reached through a proposal's share link and do not take an
//! API key. Only the share token identifies the proposal.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        proposal::PublicProposalResponse,
        usage_event::{NewUsageEvent, UsageEventType},
    },
    services::{proposal_service, usage_service},
};

/// View a shared proposal.
///
/// # Endpoint
///
/// `GET /p/{share_token}`
///
/// # Response
///
/// - **Success (200 OK)**: Public view of a sent, accepted or declined proposal
/// - **Error (404)**: Unknown token, draft, or archived proposal
///
/// Each successful view is recorded as a `proposal_viewed` usage event for the owner.
pub async fn view_proposal(
    State(pool): State<DbPool>,
    Path(share_token): Path<String>,
) -> Result<Json<PublicProposalResponse>, AppError> {
    let proposal = proposal_service::find_public(&pool, &share_token).await?;

    usage_service::record_event_detached(
        &pool,
        NewUsageEvent::for_proposal(proposal.api_key_id, proposal.id, UsageEventType::ProposalViewed),
    );

    Ok(Json(proposal.into()))
}

/// Accept a shared proposal.
///
/// # Endpoint
///
/// `POST /p/{share_token}/accept`
///
/// # Response
///
/// - **Success (200 OK)**: The proposal, now `accepted`
/// - **Error (404)**: Unknown token, draft, or archived proposal
/// - **Error (409)**: The proposal is not in `sent` status
pub async fn accept_proposal(
    State(pool): State<DbPool>,
    Path(share_token): Path<String>,
) -> Result<Json<PublicProposalResponse>, AppError> {
    let proposal = proposal_service::accept_public(&pool, &share_token).await?;

    tracing::info!(proposal_id = %proposal.id, "proposal accepted");

    usage_service::record_event_detached(
        &pool,
        NewUsageEvent::for_proposal(
            proposal.api_key_id,
            proposal.id,
            UsageEventType::ProposalAccepted,
        ),
    );

    Ok(Json(proposal.into()))
}
