//! Server-side usage events.
//!
//! Usage is tracked in one place only: rows in the `usage_events` table,
//! written by the server as proposals are created, changed and viewed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageEventType {
    ProposalCreated,
    ProposalUpdated,
    ProposalArchived,
    ProposalViewed,
    ProposalAccepted,
}

impl UsageEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            UsageEventType::ProposalCreated => "proposal_created",
            UsageEventType::ProposalUpdated => "proposal_updated",
            UsageEventType::ProposalArchived => "proposal_archived",
            UsageEventType::ProposalViewed => "proposal_viewed",
            UsageEventType::ProposalAccepted => "proposal_accepted",
        }
    }
}

/// A usage event row.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UsageEvent {
    pub id: Uuid,

    pub proposal_id: Option<Uuid>,

    pub event_type: String,

    pub metadata: Value,

    pub created_at: DateTime<Utc>,
}

/// Event data before insertion.
///
/// `api_key_id` is the owner of the proposal the event concerns; public views
/// are attributed to the proposal's owner.
#[derive(Debug, Clone)]
pub struct NewUsageEvent {
    pub api_key_id: Uuid,
    pub proposal_id: Option<Uuid>,
    pub event_type: UsageEventType,
    pub metadata: Value,
}

impl NewUsageEvent {
    pub fn for_proposal(api_key_id: Uuid, proposal_id: Uuid, event_type: UsageEventType) -> Self {
        Self {
            api_key_id,
            proposal_id: Some(proposal_id),
            event_type,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}
