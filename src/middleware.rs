//! Admission Middleware
//!
//! Tower middleware layer for guarding Axum form routes. Each request is
//! checked in order: origin validation, identifier resolution, rate limit.
//! Admitted requests carry their resolved [`ClientId`] in the request
//! extensions; rejected ones are answered directly with the matching
//! error response and never reach the handler.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::response::IntoResponse;
use futures::future::BoxFuture;
use hyper::Request;
use tower::{Layer, Service};

use crate::extract::ClientId;
use crate::limiter::RateLimiter;
use crate::origin::OriginPolicy;
use crate::prelude::*;

/// Per-route quota override
#[derive(Clone, Copy, Debug)]
struct QuotaOverride {
	limit: u32,
	window: Duration,
}

/// Admission middleware layer
#[derive(Clone)]
pub struct AdmissionLayer {
	limiter: Arc<RateLimiter>,
	origin: Arc<OriginPolicy>,
	quota: Option<QuotaOverride>,
}

impl AdmissionLayer {
	/// Create a new admission layer
	pub fn new(limiter: Arc<RateLimiter>, origin: OriginPolicy) -> Self {
		Self { limiter, origin: Arc::new(origin), quota: None }
	}

	/// Use a custom limit and window for routes behind this layer instead
	/// of the limiter's defaults
	pub fn with_quota(mut self, limit: u32, window: Duration) -> Self {
		self.quota = Some(QuotaOverride { limit, window });
		self
	}
}

impl<S> Layer<S> for AdmissionLayer {
	type Service = AdmissionService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		AdmissionService {
			inner,
			limiter: self.limiter.clone(),
			origin: self.origin.clone(),
			quota: self.quota,
		}
	}
}

/// Admission middleware service
#[derive(Clone)]
pub struct AdmissionService<S> {
	inner: S,
	limiter: Arc<RateLimiter>,
	origin: Arc<OriginPolicy>,
	quota: Option<QuotaOverride>,
}

impl<S> Service<Request<Body>> for AdmissionService<S>
where
	S: Service<Request<Body>, Response = axum::response::Response> + Clone + Send + 'static,
	S::Future: Send + 'static,
{
	type Response = S::Response;
	type Error = S::Error;
	type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, mut req: Request<Body>) -> Self::Future {
		let limiter = self.limiter.clone();
		let origin = self.origin.clone();
		let quota = self.quota;
		let mut inner = self.inner.clone();

		Box::pin(async move {
			// Validate the declared origin
			if !origin.validate(req.headers()) {
				debug!("Rejected request with unacceptable origin");
				return Ok(AdmissionError::OriginDenied.into_response());
			}

			// Resolve the identifier and check the quota
			let identifier = limiter.resolver().resolve(req.headers());
			let decision = match quota {
				Some(quota) => limiter.check_with(&identifier, quota.limit, quota.window),
				None => limiter.check(&identifier),
			};

			if !decision.allowed {
				let wait_ms = u64::try_from(decision.reset_at.0 - limiter.now().0)
					.unwrap_or_default();
				let error = AdmissionError::RateLimited {
					retry_after: Duration::from_millis(wait_ms),
					reset_at: decision.reset_at,
				};
				return Ok(error.into_response());
			}

			// Admitted - hand the identifier to the handler and proceed
			req.extensions_mut().insert(ClientId(identifier));
			inner.call(req).await
		})
	}
}

// vim: ts=4
