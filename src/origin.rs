//! Request Origin Validation
//!
//! Deters cross-site form submission by checking the declared origin of a
//! request against the serving host or an explicit allow-list. This is a
//! deterrent, not authentication: the headers are client-supplied and a
//! non-browser client can forge them freely.
//!
//! Requests carrying neither `origin` nor `referer` pass, because browsers
//! omit both on some same-origin fetches. Anything that does declare an
//! origin must parse; malformed URLs fail closed.

use axum::http::HeaderMap;
use url::Url;

use crate::config::OriginConfig;

/// Origin validation policy for form endpoints
#[derive(Clone, Debug)]
pub struct OriginPolicy {
	allowed_origins: Vec<Box<str>>,
}

impl OriginPolicy {
	/// Create a policy from configuration
	pub fn new(config: OriginConfig) -> Self {
		Self { allowed_origins: config.allowed_origins }
	}

	/// Policy with no allow-list: the declared origin must match the
	/// serving host
	pub fn same_host() -> Self {
		Self { allowed_origins: Vec::new() }
	}

	/// Decide whether the request's declared origin is acceptable
	pub fn validate(&self, headers: &HeaderMap) -> bool {
		let origin = header_str(headers, "origin");
		let referer = header_str(headers, "referer");

		// Same-origin fetches may omit both headers entirely
		if origin.is_none() && referer.is_none() {
			return true;
		}

		if !self.allowed_origins.is_empty() {
			if let Some(origin) = origin {
				if self.allowed_origins.iter().any(|allowed| allowed.as_ref() == origin) {
					return true;
				}
			}
			// Origin absent or unlisted: accept a referer served by a
			// listed origin
			if let Some(referer_host) = referer.and_then(url_host) {
				return self
					.allowed_origins
					.iter()
					.any(|allowed| url_host(allowed).is_some_and(|host| host == referer_host));
			}
			return false;
		}

		// No allow-list: the declared host must equal the serving host.
		// An unparseable origin is a declaration, not an absence, so it
		// is not rescued by a well-formed referer.
		let declared = match origin {
			Some(origin) => url_host(origin),
			None => referer.and_then(url_host),
		};
		match (declared, header_str(headers, "host")) {
			(Some(declared), Some(host)) => declared == strip_port(host),
			_ => false,
		}
	}
}

impl Default for OriginPolicy {
	fn default() -> Self {
		Self::same_host()
	}
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers.get(name).and_then(|h| h.to_str().ok())
}

/// Host component of an absolute URL, or None if it does not parse
fn url_host(value: &str) -> Option<String> {
	Url::parse(value).ok().and_then(|url| url.host_str().map(str::to_owned))
}

/// Strip a trailing `:port` from a Host header value
fn strip_port(host: &str) -> &str {
	match host.rsplit_once(':') {
		Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
		_ => host,
	}
}


// vim: ts=4
