//! Data models representing database entities.

/// API key credential model
pub mod credential;
/// Proposal model and request/response types
pub mod proposal;
/// Server-side usage events
pub mod usage_event;
