//! HTTP request handlers (route handlers).

/// Service health
pub mod health;
/// Owner-side proposal CRUD
pub mod proposals;
/// Share-link viewer
pub mod public;
/// Usage event listing
pub mod usage;
