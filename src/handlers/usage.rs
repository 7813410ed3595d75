//! Usage event listing.

use axum::{Extension, Json, extract::State};

use crate::{
    db::DbPool, error::AppError, middleware::auth::AuthContext, models::usage_event::UsageEvent,
    services::usage_service,
};

/// `GET /api/v1/usage`
///
/// Returns the authenticated key's most recent usage events (newest first, at
/// most 100).
pub async fn list_usage_events(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<UsageEvent>>, AppError> {
    let events = usage_service::list_events(&pool, auth.api_key_id).await?;

    Ok(Json(events))
}
