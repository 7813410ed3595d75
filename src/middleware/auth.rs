//! API key authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the API key from the Authorization header
//! 2. Let the [`RequestGuard`] verify it and apply the per-key rate limit
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized (401) or throttled (429) requests

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    auth::{RequestGuard, guard::bearer_secret},
    error::AppError,
};

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Authentication context attached to authenticated requests.
///
/// Inserted into the request's extension map; handlers extract it with
/// `Extension<AuthContext>` to scope their queries.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authenticated API key
    pub api_key_id: Uuid,

    /// Display name of the key's owner
    pub key_name: String,
}

/// API key authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>` header from request
/// 2. Authenticate and rate limit through the guard
/// 3. If admitted: inject `AuthContext`, schedule the `last_used_at` update,
///    call the next handler and attach rate limit headers to its response
/// 4. Otherwise: return 401 or 429 with no detail about which check failed
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer abc123xyz
/// ```
pub async fn auth_middleware(
    State(guard): State<Arc<RequestGuard>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let endpoint = request.uri().path().to_string();
    let presented = bearer_secret(request.headers()).map(str::to_owned);

    let admission = guard.admit(presented.as_deref(), &endpoint).await?;

    // Not awaited: a failed touch must not hold up the response
    guard.record_use(admission.credential.id);

    request.extensions_mut().insert(AuthContext {
        api_key_id: admission.credential.id,
        key_name: admission.credential.name,
    });

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        RATE_LIMIT_LIMIT,
        HeaderValue::from(guard.limiter().capacity()),
    );
    headers.insert(
        RATE_LIMIT_REMAINING,
        HeaderValue::from(admission.quota.remaining),
    );

    Ok(response)
}
