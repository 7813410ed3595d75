//! API key authentication and per-key rate limiting.
//!
//! - [`hasher`]: SHA-256 digests of secrets
//! - [`store`]: credential lookup trait and its Postgres implementation
//! - [`rate_limit`]: fixed-window limiter with an injected clock
//! - [`guard`]: composes the above for each inbound request

pub mod clock;
pub mod error;
pub mod guard;
pub mod hasher;
pub mod rate_limit;
pub mod store;

pub use error::AuthFailure;
pub use guard::RequestGuard;
