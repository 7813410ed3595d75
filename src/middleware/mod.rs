//! HTTP middleware components.

/// API key authentication and rate limiting middleware
pub mod auth;
