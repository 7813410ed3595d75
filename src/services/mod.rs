//! Business logic services.
//!
//! Services contain persistence and lifecycle rules separated from HTTP handlers.

pub mod proposal_service;
pub mod usage_service;
