//! Request guard: authenticates a presented API key and applies the rate limit.
//!
//! # Flow
//!
//! 1. Extract the secret from `Authorization: Bearer <secret>`
//! 2. Hash it and look up an active credential by digest
//! 3. Consume one request from the credential's rate window
//! 4. Log the attempt (never the secret, at most a digest prefix)
//!
//! Updating `last_used_at` is left to the caller via [`RequestGuard::record_use`],
//! which runs detached so a slow or failing write never delays the response.

use std::sync::Arc;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::error::AuthFailure;
use super::hasher::{digest_hint, hash_secret};
use super::rate_limit::{RateDecision, RateLimiter};
use super::store::CredentialStore;
use crate::models::credential::Credential;

/// Extract the secret from a bearer-style `Authorization` header.
///
/// Returns `None` if the header is absent, not valid UTF-8, or not of the form
/// `Bearer <secret>`.
pub fn bearer_secret(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
}

/// A request that passed authentication and the rate limit.
#[derive(Debug, Clone)]
pub struct Admission {
    pub credential: Credential,
    pub quota: RateDecision,
}

pub struct RequestGuard {
    store: Arc<dyn CredentialStore>,
    limiter: RateLimiter<Uuid>,
}

impl RequestGuard {
    pub fn new(store: Arc<dyn CredentialStore>, limiter: RateLimiter<Uuid>) -> Self {
        Self { store, limiter }
    }

    pub fn limiter(&self) -> &RateLimiter<Uuid> {
        &self.limiter
    }

    /// Resolve a presented secret to its active credential.
    pub async fn authenticate(&self, presented_secret: &str) -> Result<Credential, AuthFailure> {
        let presented_secret = presented_secret.trim();
        if presented_secret.is_empty() {
            return Err(AuthFailure::MissingCredential);
        }

        let digest = hash_secret(presented_secret);

        match self.store.find_active_by_digest(&digest).await {
            Ok(Some(credential)) if credential.is_active => Ok(credential),
            Ok(_) => {
                tracing::debug!(digest = digest_hint(&digest), "no active credential for digest");
                Err(AuthFailure::InvalidCredential)
            }
            Err(e) => {
                tracing::error!(error = %e, "credential lookup failed");
                Err(AuthFailure::UpstreamLookupFailure(e.to_string()))
            }
        }
    }

    /// Authenticate and rate limit one request to `endpoint`.
    ///
    /// Emits exactly one structured log line for the attempt.
    pub async fn admit(
        &self,
        presented_secret: Option<&str>,
        endpoint: &str,
    ) -> Result<Admission, AuthFailure> {
        let outcome = match presented_secret {
            None => Err((None, AuthFailure::MissingCredential)),
            Some(secret) => match self.authenticate(secret).await {
                Err(failure) => Err((None, failure)),
                Ok(credential) => {
                    let quota = self.limiter.check_and_consume(&credential.id);
                    if quota.allowed {
                        Ok(Admission { credential, quota })
                    } else {
                        let retry_after_secs = quota.reset_after.as_secs().max(1);
                        Err((
                            Some(credential.id),
                            AuthFailure::RateLimited { retry_after_secs },
                        ))
                    }
                }
            },
        };

        let timestamp = Utc::now();
        match outcome {
            Ok(admission) => {
                tracing::info!(
                    credential_id = %admission.credential.id,
                    endpoint,
                    success = true,
                    remaining = admission.quota.remaining,
                    %timestamp,
                    "authentication attempt"
                );
                Ok(admission)
            }
            Err((credential_id, failure)) => {
                let credential_id = credential_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                tracing::warn!(
                    %credential_id,
                    endpoint,
                    success = false,
                    reason = failure.kind(),
                    %timestamp,
                    "authentication attempt"
                );
                Err(failure)
            }
        }
    }

    /// Update the credential's last-used time in the background.
    ///
    /// Failures are logged and otherwise ignored. Each admitted request spawns
    /// its own task; nothing bounds how many touches are in flight, so a slow
    /// store lets them pile up at high request rates.
    pub fn record_use(&self, credential_id: Uuid) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.touch_last_used(credential_id).await {
                tracing::warn!(%credential_id, error = %e, "failed to update last_used_at");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::MockClock;
    use crate::auth::store::InMemoryCredentialStore;
    use axum::http::HeaderValue;
    use std::time::{Duration, Instant};

    fn guard_with(capacity: u32) -> (RequestGuard, Arc<InMemoryCredentialStore>, MockClock) {
        let store = Arc::new(InMemoryCredentialStore::default());
        let clock = MockClock::new(Instant::now());
        let limiter = RateLimiter::new(capacity, Duration::from_secs(60), Arc::new(clock.clone()));
        let guard = RequestGuard::new(store.clone(), limiter);
        (guard, store, clock)
    }

    #[test]
    fn bearer_secret_parses_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_secret(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_secret(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer sk_123"));
        assert_eq!(bearer_secret(&headers), Some("sk_123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_secret(&headers), Some(""));
    }

    #[tokio::test]
    async fn empty_secret_is_missing_credential() {
        let (guard, _store, _clock) = guard_with(100);

        assert!(matches!(
            guard.authenticate("").await,
            Err(AuthFailure::MissingCredential)
        ));
        assert!(matches!(
            guard.authenticate("   ").await,
            Err(AuthFailure::MissingCredential)
        ));
        assert!(matches!(
            guard.admit(None, "/api/v1/proposals").await,
            Err(AuthFailure::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn active_credential_is_returned() {
        let (guard, store, _clock) = guard_with(100);
        let expected = store.add("Acme", "active-secret", true);

        let credential = guard.authenticate("active-secret").await.unwrap();
        assert_eq!(credential.id, expected.id);
        assert_eq!(credential.name, "Acme");
    }

    #[tokio::test]
    async fn surrounding_whitespace_is_ignored() {
        let (guard, store, _clock) = guard_with(100);
        let expected = store.add("Acme", "active-secret", true);

        let credential = guard.authenticate("  active-secret\t").await.unwrap();
        assert_eq!(credential.id, expected.id);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer  active-secret"));
        let admitted = guard.admit(bearer_secret(&headers), "/x").await.unwrap();
        assert_eq!(admitted.credential.id, expected.id);
    }

    #[tokio::test]
    async fn inactive_credential_is_invalid() {
        let (guard, store, _clock) = guard_with(100);
        store.add("Revoked", "old-secret", false);

        assert!(matches!(
            guard.authenticate("old-secret").await,
            Err(AuthFailure::InvalidCredential)
        ));
    }

    #[tokio::test]
    async fn unknown_secret_is_invalid() {
        let (guard, store, _clock) = guard_with(100);
        store.add("Acme", "active-secret", true);

        assert!(matches!(
            guard.authenticate("guess").await,
            Err(AuthFailure::InvalidCredential)
        ));
    }

    #[tokio::test]
    async fn lookup_error_is_upstream_failure() {
        let (guard, store, _clock) = guard_with(100);
        store.add("Acme", "active-secret", true);
        store.fail_lookups(true);

        assert!(matches!(
            guard.authenticate("active-secret").await,
            Err(AuthFailure::UpstreamLookupFailure(_))
        ));
    }

    #[tokio::test]
    async fn admit_applies_rate_limit_per_credential() {
        let (guard, store, clock) = guard_with(2);
        store.add("Acme", "acme-secret", true);
        store.add("Globex", "globex-secret", true);

        let first = guard.admit(Some("acme-secret"), "/x").await.unwrap();
        assert_eq!(first.quota.remaining, 1);
        let second = guard.admit(Some("acme-secret"), "/x").await.unwrap();
        assert_eq!(second.quota.remaining, 0);

        clock.advance(Duration::from_secs(15));
        match guard.admit(Some("acme-secret"), "/x").await {
            Err(AuthFailure::RateLimited { retry_after_secs }) => assert_eq!(retry_after_secs, 45),
            other => panic!("expected rate limit, got {other:?}"),
        }

        // Other credentials have their own window
        assert!(guard.admit(Some("globex-secret"), "/x").await.is_ok());

        clock.advance(Duration::from_secs(45));
        let reset = guard.admit(Some("acme-secret"), "/x").await.unwrap();
        assert_eq!(reset.quota.remaining, 1);
    }

    #[tokio::test]
    async fn rejected_secrets_do_not_consume_quota() {
        let (guard, _store, _clock) = guard_with(1);

        for _ in 0..5 {
            assert!(guard.admit(Some("nope"), "/x").await.is_err());
        }
        assert_eq!(guard.limiter().tracked(), 0);
    }

    #[tokio::test]
    async fn record_use_touches_last_used() {
        let (guard, store, _clock) = guard_with(100);
        let credential = store.add("Acme", "acme-secret", true);

        guard.record_use(credential.id).await.unwrap();
        assert!(store.get(credential.id).unwrap().last_used_at.is_some());
    }

    #[tokio::test]
    async fn record_use_failure_is_not_fatal() {
        let (guard, store, _clock) = guard_with(100);
        let credential = store.add("Acme", "acme-secret", true);
        store.fail_touches(true);

        // The task completes without panicking
        guard.record_use(credential.id).await.unwrap();
        assert!(store.get(credential.id).unwrap().last_used_at.is_none());
    }
}
