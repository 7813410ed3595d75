//! Proposal data models and API request/response types.
//!
//! This module defines:
//! - `Proposal`: Database entity representing a proposal
//! - `ProposalStatus`: Lifecycle states stored in the `status` column
//! - `CreateProposalRequest` / `UpdateProposalRequest`: Request bodies
//! - `ProposalResponse` / `PublicProposalResponse`: Owner and public views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;

/// Maximum length of a proposal title.
pub const MAX_TITLE_LEN: usize = 200;

/// Represents a proposal record from the database.
///
/// # Database Table
///
/// Maps to the `proposals` table. Each proposal:
/// - Belongs to one API key (via `api_key_id`)
/// - Has a total stored in cents (to avoid floating-point errors)
/// - Has a random `share_token` used by the public viewer
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Proposal {
    pub id: Uuid,

    /// Foreign key to the API key that owns this proposal.
    ///
    /// Every owner-side query filters on it so keys cannot see each other's proposals.
    pub api_key_id: Uuid,

    pub title: String,

    pub client_name: String,

    pub client_email: Option<String>,

    /// Currency code (ISO 4217, 3 letters)
    pub currency: String,

    /// Proposal total in cents
    pub total_cents: i64,

    /// Ordered content sections (JSON array), rendered by the frontend.
    pub sections: Value,

    /// One of [`ProposalStatus`] as lowercase text.
    pub status: String,

    /// Unguessable token for `GET /p/{share_token}`
    pub share_token: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn status(&self) -> Option<ProposalStatus> {
        ProposalStatus::parse(&self.status)
    }
}

/// Proposal lifecycle.
///
/// `Archived` is only reachable through `DELETE`; archived proposals are hidden
/// everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Draft,
    Sent,
    Accepted,
    Declined,
    Archived,
}

impl ProposalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProposalStatus::Draft => "draft",
            ProposalStatus::Sent => "sent",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Declined => "declined",
            ProposalStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ProposalStatus::Draft),
            "sent" => Some(ProposalStatus::Sent),
            "accepted" => Some(ProposalStatus::Accepted),
            "declined" => Some(ProposalStatus::Declined),
            "archived" => Some(ProposalStatus::Archived),
            _ => None,
        }
    }

    /// Whether the public viewer may show a proposal in this state.
    pub fn is_public(self) -> bool {
        matches!(
            self,
            ProposalStatus::Sent | ProposalStatus::Accepted | ProposalStatus::Declined
        )
    }
}

/// Request body for creating a new proposal.
///
/// # JSON Example
///
/// ```json
/// {
///   "title": "Website redesign",
///   "client_name": "Globex",
///   "client_email": "cto@globex.example",
///   "currency": "EUR",
///   "total_cents": 1250000,
///   "sections": [{"heading": "Scope", "body": "..."}]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateProposalRequest {
    pub title: String,

    pub client_name: String,

    #[serde(default)]
    pub client_email: Option<String>,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default)]
    pub total_cents: i64,

    #[serde(default = "default_sections")]
    pub sections: Value,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_sections() -> Value {
    Value::Array(Vec::new())
}

impl CreateProposalRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)?;
        validate_client_name(&self.client_name)?;
        validate_currency(&self.currency)?;
        validate_total(self.total_cents)?;
        validate_sections(&self.sections)
    }
}

/// Partial update. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProposalRequest {
    pub title: Option<String>,
    pub client_name: Option<String>,
    /// Absent: unchanged. `null`: cleared. A string: replaced.
    #[serde(default, deserialize_with = "present")]
    pub client_email: Option<Option<String>>,
    pub currency: Option<String>,
    pub total_cents: Option<i64>,
    pub sections: Option<Value>,
    pub status: Option<ProposalStatus>,
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateProposalRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(client_name) = &self.client_name {
            validate_client_name(client_name)?;
        }
        if let Some(currency) = &self.currency {
            validate_currency(currency)?;
        }
        if let Some(total) = self.total_cents {
            validate_total(total)?;
        }
        if let Some(sections) = &self.sections {
            validate_sections(sections)?;
        }
        if self.status == Some(ProposalStatus::Archived) {
            return Err(AppError::InvalidRequest(
                "Use DELETE to archive a proposal".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidRequest("title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::InvalidRequest(format!(
            "title exceeds {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_client_name(client_name: &str) -> Result<(), AppError> {
    if client_name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "client_name is required".to_string(),
        ));
    }
    Ok(())
}

fn validate_currency(currency: &str) -> Result<(), AppError> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(AppError::InvalidRequest(
            "currency must be a 3-letter ISO 4217 code".to_string(),
        ));
    }
    Ok(())
}

fn validate_total(total_cents: i64) -> Result<(), AppError> {
    if total_cents < 0 {
        return Err(AppError::InvalidRequest(
            "total_cents must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_sections(sections: &Value) -> Result<(), AppError> {
    if !sections.is_array() {
        return Err(AppError::InvalidRequest(
            "sections must be a JSON array".to_string(),
        ));
    }
    Ok(())
}

/// Owner view of a proposal. Omits the internal `api_key_id`.
#[derive(Debug, Serialize)]
pub struct ProposalResponse {
    pub id: Uuid,
    pub title: String,
    pub client_name: String,
    pub client_email: Option<String>,
    pub currency: String,
    pub total_cents: i64,
    pub sections: Value,
    pub status: String,
    pub share_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Proposal> for ProposalResponse {
    fn from(proposal: Proposal) -> Self {
        Self {
            id: proposal.id,
            title: proposal.title,
            client_name: proposal.client_name,
            client_email: proposal.client_email,
            currency: proposal.currency,
            total_cents: proposal.total_cents,
            sections: proposal.sections,
            status: proposal.status,
            share_token: proposal.share_token,
            created_at: proposal.created_at,
            updated_at: proposal.updated_at,
        }
    }
}

/// What the client sees at `/p/{share_token}`.
///
/// No owner identifiers, no contact email, no share token.
#[derive(Debug, Serialize)]
pub struct PublicProposalResponse {
    pub title: String,
    pub client_name: String,
    pub currency: String,
    pub total_cents: i64,
    pub sections: Value,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl From<Proposal> for PublicProposalResponse {
    fn from(proposal: Proposal) -> Self {
        Self {
            title: proposal.title,
            client_name: proposal.client_name,
            currency: proposal.currency,
            total_cents: proposal.total_cents,
            sections: proposal.sections,
            status: proposal.status,
            updated_at: proposal.updated_at,
        }
    }
}
