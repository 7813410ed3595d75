//! Reasons a request can be turned away by the guard.

/// Rejection reasons produced by [`RequestGuard`](super::guard::RequestGuard).
///
/// These are internal. `MissingCredential`, `InvalidCredential` and
/// `UpstreamLookupFailure` all reach the client as the same 401 so that a
/// caller cannot tell which check failed.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    /// No `Authorization: Bearer <secret>` header, or an empty secret.
    #[error("missing credential")]
    MissingCredential,

    /// No active credential matches the presented secret.
    #[error("invalid credential")]
    InvalidCredential,

    /// The credential is valid but its window is exhausted.
    #[error("rate limited")]
    RateLimited { retry_after_secs: u64 },

    /// The credential store could not be queried.
    #[error("credential lookup failed: {0}")]
    UpstreamLookupFailure(String),
}

impl AuthFailure {
    /// Stable name for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthFailure::MissingCredential => "missing_credential",
            AuthFailure::InvalidCredential => "invalid_credential",
            AuthFailure::RateLimited { .. } => "rate_limited",
            AuthFailure::UpstreamLookupFailure(_) => "upstream_lookup_failure",
        }
    }
}
