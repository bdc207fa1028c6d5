//! Admission control for public form endpoints.
//!
//! This crate fronts lead-generation and onboarding form handlers with the
//! checks they need before any work happens: request-origin validation, a
//! fixed-window rate limit keyed by client identifier, and attribution of
//! each request to that identifier. State lives in process memory, which
//! keeps the hot path to one lock acquisition and makes the crate a fit
//! for single-instance deployments; a multi-instance deployment gets an
//! independent quota per instance.
//!
//! The usual setup is one shared [`RateLimiter`] plus an [`AdmissionLayer`]
//! per guarded route group:
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::{routing::post, Router};
//! use formshield::{AdmissionLayer, ClientId, OriginPolicy, RateLimiter};
//!
//! async fn submit(ClientId(client): ClientId) -> String {
//! 	format!("accepted from {}", client)
//! }
//!
//! let limiter = Arc::new(RateLimiter::default());
//! limiter.spawn_sweeper();
//!
//! let app: Router = Router::new()
//! 	.route("/api/contact", post(submit))
//! 	.layer(AdmissionLayer::new(limiter.clone(), OriginPolicy::same_host()));
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod extract;
pub mod limiter;
pub mod middleware;
pub mod origin;
pub mod prelude;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{OriginConfig, RateLimitConfig};
pub use error::AdmissionError;
pub use extract::{client_identifier, ClientId, IdentifierResolver};
pub use limiter::{AdmissionStats, RateLimitDecision, RateLimitStatus, RateLimiter};
pub use middleware::AdmissionLayer;
pub use origin::OriginPolicy;
pub use types::{SystemClock, TimeSource, Timestamp};

// vim: ts=4
