//! Admission middleware integration tests
//!
//! Drives a real Axum router through the admission layer and checks the
//! responses a client would see: admissions, quota rejections with their
//! headers, and origin rejections.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use formshield::{
	AdmissionLayer, ClientId, OriginConfig, OriginPolicy, RateLimitConfig, RateLimiter,
};

async fn submit(ClientId(client): ClientId) -> String {
	format!("accepted:{}", client)
}

fn test_router(limit: u32, origin: OriginPolicy) -> (Arc<RateLimiter>, Router) {
	let config = RateLimitConfig::with_quota(limit, Duration::from_secs(3600));
	let limiter = Arc::new(RateLimiter::new(config));
	let router = Router::new()
		.route("/api/contact", post(submit))
		.layer(AdmissionLayer::new(limiter.clone(), origin));
	(limiter, router)
}

fn contact_request(headers: &[(&str, &str)]) -> Request<Body> {
	let mut builder = Request::builder().method("POST").uri("/api/contact");
	for (name, value) in headers {
		builder = builder.header(*name, *value);
	}
	builder.body(Body::empty()).expect("Failed to build request")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
	let bytes = response.into_body().collect().await.expect("Failed to read body").to_bytes();
	serde_json::from_slice(&bytes).expect("Body was not JSON")
}

#[tokio::test]
async fn test_admits_and_resolves_client() {
	let (_limiter, router) = test_router(5, OriginPolicy::same_host());

	let request = contact_request(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1")]);
	let response = router.clone().oneshot(request).await.expect("Request failed");

	assert_eq!(response.status(), StatusCode::OK);
	let bytes = response.into_body().collect().await.expect("Failed to read body").to_bytes();
	assert_eq!(&bytes[..], b"accepted:203.0.113.7");
}

#[tokio::test]
async fn test_denies_when_quota_exhausted() {
	let (_limiter, router) = test_router(2, OriginPolicy::same_host());
	let client = [("x-forwarded-for", "203.0.113.7")];

	for _ in 0..2 {
		let response =
			router.clone().oneshot(contact_request(&client)).await.expect("Request failed");
		assert_eq!(response.status(), StatusCode::OK);
	}

	let response = router.clone().oneshot(contact_request(&client)).await.expect("Request failed");
	assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

	let retry_after: u64 = response
		.headers()
		.get("Retry-After")
		.expect("Missing Retry-After header")
		.to_str()
		.expect("Retry-After not a string")
		.parse()
		.expect("Retry-After not a number");
	assert!(retry_after > 0 && retry_after <= 3600);
	assert!(response.headers().contains_key("X-RateLimit-Reset"));

	let body = body_json(response).await;
	assert_eq!(body["error"]["code"], "E-RATE-LIMITED");
	assert!(body["error"]["details"]["resetAt"].is_number());
}

#[tokio::test]
async fn test_quota_is_per_identifier() {
	let (_limiter, router) = test_router(1, OriginPolicy::same_host());

	let first = contact_request(&[("x-forwarded-for", "203.0.113.7")]);
	let again = contact_request(&[("x-forwarded-for", "203.0.113.7")]);
	let other = contact_request(&[("x-forwarded-for", "198.51.100.9")]);

	assert_eq!(router.clone().oneshot(first).await.expect("Request failed").status(), StatusCode::OK);
	assert_eq!(
		router.clone().oneshot(again).await.expect("Request failed").status(),
		StatusCode::TOO_MANY_REQUESTS
	);
	assert_eq!(router.clone().oneshot(other).await.expect("Request failed").status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unattributed_clients_share_fallback_bucket() {
	let (limiter, router) = test_router(1, OriginPolicy::same_host());

	// No forwarding headers at all: every such client lands in the same
	// fallback bucket and competes for one quota
	let response =
		router.clone().oneshot(contact_request(&[])).await.expect("Request failed");
	assert_eq!(response.status(), StatusCode::OK);

	let response =
		router.clone().oneshot(contact_request(&[])).await.expect("Request failed");
	assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

	let stats = limiter.stats();
	assert_eq!(stats.total_unattributed, 2);
	assert_eq!(stats.total_denied, 1);
}

#[tokio::test]
async fn test_cross_origin_rejected_before_rate_limit() {
	let (limiter, router) = test_router(5, OriginPolicy::same_host());

	let request = contact_request(&[
		("x-forwarded-for", "203.0.113.7"),
		("host", "example.com"),
		("origin", "https://evil.com"),
	]);
	let response = router.clone().oneshot(request).await.expect("Request failed");

	assert_eq!(response.status(), StatusCode::FORBIDDEN);
	let body = body_json(response).await;
	assert_eq!(body["error"]["code"], "E-ORIGIN-DENIED");

	// Origin rejection happens before the limiter; no quota was consumed
	assert_eq!(limiter.stats().tracked_identifiers, 0);
}

#[tokio::test]
async fn test_same_origin_allowed() {
	let (_limiter, router) = test_router(5, OriginPolicy::same_host());

	let request = contact_request(&[
		("x-forwarded-for", "203.0.113.7"),
		("host", "example.com"),
		("origin", "https://example.com"),
	]);
	let response = router.clone().oneshot(request).await.expect("Request failed");
	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_allow_listed_origin() {
	let policy = OriginPolicy::new(OriginConfig::with_allowed(["https://partner.example.com"]));
	let (_limiter, router) = test_router(5, policy);

	let listed = contact_request(&[
		("x-forwarded-for", "203.0.113.7"),
		("origin", "https://partner.example.com"),
	]);
	let unlisted = contact_request(&[
		("x-forwarded-for", "203.0.113.7"),
		("origin", "https://other.example.com"),
	]);

	assert_eq!(router.clone().oneshot(listed).await.expect("Request failed").status(), StatusCode::OK);
	assert_eq!(
		router.clone().oneshot(unlisted).await.expect("Request failed").status(),
		StatusCode::FORBIDDEN
	);
}

#[tokio::test]
async fn test_reset_reopens_quota() {
	let (limiter, router) = test_router(1, OriginPolicy::same_host());
	let client = [("x-forwarded-for", "203.0.113.7")];

	assert_eq!(
		router.clone().oneshot(contact_request(&client)).await.expect("Request failed").status(),
		StatusCode::OK
	);
	assert_eq!(
		router.clone().oneshot(contact_request(&client)).await.expect("Request failed").status(),
		StatusCode::TOO_MANY_REQUESTS
	);

	limiter.reset("203.0.113.7");

	assert_eq!(
		router.clone().oneshot(contact_request(&client)).await.expect("Request failed").status(),
		StatusCode::OK
	);
}

#[tokio::test]
async fn test_route_quota_override() {
	// Limiter defaults allow 5; the layer overrides down to 1 for this route
	let limiter = Arc::new(RateLimiter::default());
	let layer = AdmissionLayer::new(limiter.clone(), OriginPolicy::same_host())
		.with_quota(1, Duration::from_secs(60));
	let router = Router::new().route("/api/contact", post(submit)).layer(layer);
	let client = [("x-forwarded-for", "203.0.113.7")];

	assert_eq!(
		router.clone().oneshot(contact_request(&client)).await.expect("Request failed").status(),
		StatusCode::OK
	);
	assert_eq!(
		router.clone().oneshot(contact_request(&client)).await.expect("Request failed").status(),
		StatusCode::TOO_MANY_REQUESTS
	);
}

#[tokio::test]
async fn test_unguarded_route_bypasses_admission() {
	let (limiter, _router) = test_router(1, OriginPolicy::same_host());

	// A route group without the layer is not affected by the limiter
	let open_router: Router = Router::new().route("/healthz", post(|| async { "ok" }));
	let request = Request::builder()
		.method("POST")
		.uri("/healthz")
		.body(Body::empty())
		.expect("Failed to build request");

	let response = open_router.oneshot(request).await.expect("Request failed");
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(limiter.stats().tracked_identifiers, 0);
}

// vim: ts=4
