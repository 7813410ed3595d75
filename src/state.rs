//! Shared application state handed to handlers and middleware.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{auth::RequestGuard, db::DbPool};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub guard: Arc<RequestGuard>,
}

// Lets handlers keep extracting `State<DbPool>` directly
impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
