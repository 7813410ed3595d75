//! Usage event recording and listing.
//!
//! Recording is best-effort: a failed insert is logged and never fails the
//! request that produced the event.

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::usage_event::{NewUsageEvent, UsageEvent};

/// Maximum number of events returned by [`list_events`].
pub const LIST_LIMIT: i64 = 100;

/// Insert a usage event row.
pub async fn record_event(pool: &DbPool, event: &NewUsageEvent) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO usage_events (api_key_id, proposal_id, event_type, metadata)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(event.api_key_id)
    .bind(event.proposal_id)
    .bind(event.event_type.as_str())
    .bind(&event.metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record an event in the background. Errors are logged only.
///
/// One task is spawned per event with no bound on how many are in flight, the
/// same trade-off as the guard's `last_used_at` touch.
pub fn record_event_detached(pool: &DbPool, event: NewUsageEvent) -> JoinHandle<()> {
    let pool = pool.clone();
    tokio::spawn(async move {
        if let Err(e) = record_event(&pool, &event).await {
            tracing::error!(
                event_type = event.event_type.as_str(),
                api_key_id = %event.api_key_id,
                error = ?e,
                "failed to record usage event"
            );
        }
    })
}

/// Most recent events for an API key, newest first.
pub async fn list_events(pool: &DbPool, api_key_id: Uuid) -> Result<Vec<UsageEvent>, AppError> {
    let events = sqlx::query_as::<_, UsageEvent>(
        r#"
        SELECT id, proposal_id, event_type, metadata, created_at
        FROM usage_events
        WHERE api_key_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(api_key_id)
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(events)
}
