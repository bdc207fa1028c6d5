//! Admission Control Configuration
//!
//! Configuration structs for the fixed-window limiter and the origin
//! policy, with the defaults used by public form endpoints.

use std::time::Duration;

/// Fixed-window rate limit configuration
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
	/// Admitted requests per identifier per window
	pub limit: u32,
	/// Window length
	pub window: Duration,
	/// How often the background sweeper removes expired records
	pub sweep_interval: Duration,
	/// Identifier recorded for clients with no attribution headers
	pub fallback_identifier: Box<str>,
}

impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			// Form submissions are rare per visitor; 5/hour absorbs retries
			// while stopping scripted runs
			limit: 5,
			window: Duration::from_secs(3600),
			sweep_interval: Duration::from_secs(300),
			fallback_identifier: "unknown".into(),
		}
	}
}

impl RateLimitConfig {
	/// Config with a custom quota, keeping the default sweep and fallback
	pub fn with_quota(limit: u32, window: Duration) -> Self {
		Self { limit, window, ..Self::default() }
	}
}

/// Origin validation configuration
#[derive(Clone, Debug, Default)]
pub struct OriginConfig {
	/// Origins allowed to submit, as full origin strings
	/// (e.g. `https://partner.example.com`). Empty means requests must
	/// come from the serving host itself; a non-empty list replaces the
	/// host check, so deployments listing partners must list themselves
	/// too.
	pub allowed_origins: Vec<Box<str>>,
}

impl OriginConfig {
	/// Config accepting exactly the listed origins
	pub fn with_allowed<I, S>(origins: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<Box<str>>,
	{
		Self { allowed_origins: origins.into_iter().map(Into::into).collect() }
	}
}

// vim: ts=4
