//! Admission Error Types
//!
//! Error types for the HTTP boundary. The decision functions themselves
//! return plain values; these errors only shape the rejection responses
//! produced by the middleware and the extractor.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::types::Timestamp;

/// Admission error types
#[derive(Debug)]
pub enum AdmissionError {
	/// Identifier exhausted its fixed-window quota
	RateLimited {
		/// Time until the window resets
		retry_after: Duration,
		/// Absolute reset time (milliseconds since epoch)
		reset_at: Timestamp,
	},
	/// Declared origin matched neither the serving host nor the allow-list
	OriginDenied,
	/// ClientId extractor ran on a route without the admission layer
	NotResolved,
}

impl std::fmt::Display for AdmissionError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			AdmissionError::RateLimited { retry_after, .. } => {
				write!(f, "Rate limited, retry after {:?}", retry_after)
			}
			AdmissionError::OriginDenied => {
				write!(f, "Request origin not allowed")
			}
			AdmissionError::NotResolved => {
				write!(f, "Client identifier not resolved for this route")
			}
		}
	}
}

impl std::error::Error for AdmissionError {}

impl IntoResponse for AdmissionError {
	fn into_response(self) -> Response {
		match self {
			AdmissionError::RateLimited { retry_after, reset_at } => {
				let retry_secs = retry_after.as_secs();
				let body = serde_json::json!({
					"error": {
						"code": "E-RATE-LIMITED",
						"message": "Too many requests. Please slow down.",
						"details": {
							"retryAfter": retry_secs,
							"resetAt": reset_at
						}
					}
				});

				let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

				// Add standard rate limit headers
				if let Ok(val) = retry_secs.to_string().parse() {
					response.headers_mut().insert("Retry-After", val);
				}
				if let Ok(val) = reset_at.to_string().parse() {
					response.headers_mut().insert("X-RateLimit-Reset", val);
				}

				response
			}
			AdmissionError::OriginDenied => {
				let body = serde_json::json!({
					"error": {
						"code": "E-ORIGIN-DENIED",
						"message": "Request origin not allowed."
					}
				});
				(StatusCode::FORBIDDEN, Json(body)).into_response()
			}
			AdmissionError::NotResolved => {
				let body = serde_json::json!({
					"error": {
						"code": "E-INTERNAL",
						"message": "Internal admission error"
					}
				});
				(StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
			}
		}
	}
}


// vim: ts=4
