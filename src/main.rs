//! Proposal Service - Main Application Entry Point
//!
//! REST API backend for a proposal-generation product. Authenticated callers
//! manage proposals; clients open them through public share links.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: API key with SHA-256 hashing, per-key fixed-window rate limit
//! - **Format**: JSON requests/responses
//!
//! # Commands
//!
//! - `serve` (default): run the HTTP server
//! - `issue-key --name <name>`: create an API key and print its secret once
//! - `revoke-key --id <uuid>`: deactivate an API key

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use clap::{Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::auth::{
    RequestGuard,
    clock::SystemClock,
    hasher::{generate_secret, hash_secret},
    rate_limit::RateLimiter,
    store::PgCredentialStore,
};
use crate::models::credential::IssuedKey;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(version, about = "Proposal service API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Issue a new API key and print its secret
    IssueKey {
        #[arg(long)]
        name: String,
    },
    /// Deactivate an API key
    RevokeKey {
        #[arg(long)]
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::IssueKey { name } => issue_key(pool, &name).await,
        Command::RevokeKey { id } => revoke_key(pool, id).await,
    }
}

async fn serve(config: config::Config, pool: db::DbPool) -> anyhow::Result<()> {
    let limiter = RateLimiter::new(
        config.rate_limit_capacity,
        config.rate_limit_window(),
        Arc::new(SystemClock),
    );
    let store = Arc::new(PgCredentialStore::new(pool.clone()));
    let guard = Arc::new(RequestGuard::new(store, limiter));

    spawn_rate_window_pruner(Arc::clone(&guard));

    let state = AppState {
        pool,
        guard: Arc::clone(&guard),
    };
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        capacity = config.rate_limit_capacity,
        window_secs = config.rate_limit_window_secs,
        "Server listening on {}",
        addr
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP router: public health and share-link routes, plus the
/// authenticated `/api/v1` group behind the API key guard.
fn router(state: AppState) -> Router {
    let authenticated_routes = Router::new()
        .route(
            "/api/v1/proposals",
            post(handlers::proposals::create_proposal).get(handlers::proposals::list_proposals),
        )
        .route(
            "/api/v1/proposals/{id}",
            get(handlers::proposals::get_proposal)
                .patch(handlers::proposals::update_proposal)
                .delete(handlers::proposals::archive_proposal),
        )
        .route("/api/v1/usage", get(handlers::usage::list_usage_events))
        // Authenticate and rate limit every route in this group
        .route_layer(axum_middleware::from_fn_with_state(
            Arc::clone(&state.guard),
            middleware::auth::auth_middleware,
        ));

    // Share links are opened from the browser frontend on another origin
    let public_routes = Router::new()
        .route("/p/{share_token}", get(handlers::public::view_proposal))
        .route(
            "/p/{share_token}/accept",
            post(handlers::public::accept_proposal),
        )
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(public_routes)
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically drop elapsed rate windows so the table only tracks active keys.
fn spawn_rate_window_pruner(guard: Arc<RequestGuard>) {
    let period = guard.limiter().window();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let removed = guard.limiter().prune();
            if removed > 0 {
                tracing::debug!(removed, "pruned elapsed rate windows");
            }
        }
    });
}

async fn issue_key(pool: db::DbPool, name: &str) -> anyhow::Result<()> {
    let secret = generate_secret();
    let store = PgCredentialStore::new(pool);
    let credential = store.insert(name, &hash_secret(&secret)).await?;

    tracing::info!(credential_id = %credential.id, "API key issued");

    let issued = IssuedKey {
        id: credential.id,
        name: credential.name,
        secret,
        created_at: credential.created_at,
    };
    println!("{}", serde_json::to_string_pretty(&issued)?);

    Ok(())
}

async fn revoke_key(pool: db::DbPool, id: Uuid) -> anyhow::Result<()> {
    let store = PgCredentialStore::new(pool);
    if !store.deactivate(id).await? {
        anyhow::bail!("no API key with id {id}");
    }

    tracing::info!(credential_id = %id, "API key revoked");

    Ok(())
}
