//! Client Identifier Extraction
//!
//! Resolves the identifier a request is rate limited under from
//! conventional reverse-proxy headers. Identifiers are opaque strings:
//! values are trimmed but deliberately not parsed as IP addresses, so a
//! proxy chain reporting hostnames or garbage still yields a stable key.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::prelude::*;

/// Extract the client identifier from forwarding headers.
///
/// Checks `x-forwarded-for` first, then `x-real-ip`. Returns `None` when
/// neither header is readable.
pub fn client_identifier(headers: &HeaderMap) -> Option<Box<str>> {
	extract_from_xff(headers).or_else(|| extract_from_x_real_ip(headers))
}

/// Identifier from the X-Forwarded-For header
fn extract_from_xff(headers: &HeaderMap) -> Option<Box<str>> {
	headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()).and_then(|s| {
		// X-Forwarded-For can contain multiple entries: "client, proxy1, proxy2"
		// Take the first (leftmost) as the original client
		s.split(',').next().map(|ip| Box::from(ip.trim()))
	})
}

/// Identifier from the X-Real-IP header
fn extract_from_x_real_ip(headers: &HeaderMap) -> Option<Box<str>> {
	headers.get("x-real-ip").and_then(|h| h.to_str().ok()).map(|ip| Box::from(ip.trim()))
}

// IdentifierResolver //
//********************//

/// Resolves request identifiers, applying the configured fallback for
/// clients with no attribution headers.
///
/// Unattributable clients all share one bucket under the fallback
/// identifier; the resolver counts how often that happens so operators
/// can tell when the deployment is missing its forwarding headers.
#[derive(Debug)]
pub struct IdentifierResolver {
	fallback: Box<str>,
	unattributed: AtomicU64,
}

impl IdentifierResolver {
	/// Create a resolver with the given fallback identifier
	pub fn new(fallback: impl Into<Box<str>>) -> Self {
		Self { fallback: fallback.into(), unattributed: AtomicU64::new(0) }
	}

	/// Resolve the identifier for a request
	pub fn resolve(&self, headers: &HeaderMap) -> Box<str> {
		match client_identifier(headers) {
			Some(identifier) => identifier,
			None => {
				self.unattributed.fetch_add(1, Ordering::Relaxed);
				debug!("No attribution headers, falling back to {:?}", self.fallback);
				self.fallback.clone()
			}
		}
	}

	/// The configured fallback identifier
	pub fn fallback(&self) -> &str {
		&self.fallback
	}

	/// How many requests resolved to the fallback identifier
	pub fn unattributed_count(&self) -> u64 {
		self.unattributed.load(Ordering::Relaxed)
	}
}

// ClientId //
//**********//

/// Resolved client identifier, inserted into request extensions by the
/// admission middleware
#[derive(Clone, Debug)]
pub struct ClientId(pub Box<str>);

impl ClientId {
	pub fn new(identifier: &str) -> ClientId {
		ClientId(Box::from(identifier))
	}
}

impl std::fmt::Display for ClientId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl<S> FromRequestParts<S> for ClientId
where
	S: Send + Sync,
{
	type Rejection = AdmissionError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		if let Some(client_id) = parts.extensions.get::<ClientId>().cloned() {
			Ok(client_id)
		} else {
			Err(AdmissionError::NotResolved)
		}
	}
}


// vim: ts=4
