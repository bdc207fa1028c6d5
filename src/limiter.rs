//! Fixed-Window Rate Limiter
//!
//! The admission decision function over the counter store. Each identifier
//! gets a fixed window: the first admitted request opens it, subsequent
//! requests are counted against the configured limit, and once the window
//! ends the next request opens a fresh one. Denied attempts are not
//! counted, so a client that keeps retrying a closed window is not
//! punished beyond the wait it already has.
//!
//! One consequence of fixed windows is accepted here: a client can spend a
//! full quota at the end of one window and another at the start of the
//! next, so short bursts of up to twice the limit are possible.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::extract::IdentifierResolver;
use crate::prelude::*;
use crate::store::{CounterStore, RateLimitRecord};
use crate::types::{SystemClock, TimeSource};

/// Outcome of a single admission check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
	/// Whether the request is admitted
	pub allowed: bool,
	/// Admissions left in the window after this decision
	pub remaining: u32,
	/// When the window ends (milliseconds since epoch)
	pub reset_at: Timestamp,
}

/// Non-mutating view of an identifier's current quota
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
	/// Admissions left in the current window
	pub remaining: u32,
	/// When the window ends, or None if no window is open
	pub reset_at: Option<Timestamp>,
}

/// Counters describing limiter activity since startup
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionStats {
	/// Records currently held, expired-but-unswept ones included
	pub tracked_identifiers: usize,
	/// Requests denied since startup
	pub total_denied: u64,
	/// Requests that resolved to the fallback identifier
	pub total_unattributed: u64,
}

/// Fixed-window rate limiter with an in-memory store
pub struct RateLimiter {
	store: Arc<RwLock<CounterStore>>,
	config: RateLimitConfig,
	resolver: IdentifierResolver,
	clock: Arc<dyn TimeSource>,
	sweeper: Mutex<Option<JoinHandle<()>>>,
	total_denied: AtomicU64,
}

impl RateLimiter {
	/// Create a new rate limiter
	pub fn new(config: RateLimitConfig) -> Self {
		Self::with_time_source(config, Arc::new(SystemClock))
	}

	/// Create a rate limiter over a custom time source
	pub fn with_time_source(config: RateLimitConfig, clock: Arc<dyn TimeSource>) -> Self {
		let resolver = IdentifierResolver::new(config.fallback_identifier.clone());

		Self {
			store: Arc::new(RwLock::new(CounterStore::new())),
			config,
			resolver,
			clock,
			sweeper: Mutex::new(None),
			total_denied: AtomicU64::new(0),
		}
	}

	/// Run an admission check with the configured default quota
	pub fn check(&self, identifier: &str) -> RateLimitDecision {
		self.check_with(identifier, self.config.limit, self.config.window)
	}

	/// Run an admission check with an explicit quota.
	///
	/// The whole read-decide-write runs under one lock acquisition, so two
	/// concurrent requests for the same identifier cannot both see the
	/// same count.
	pub fn check_with(&self, identifier: &str, limit: u32, window: Duration) -> RateLimitDecision {
		let now = self.clock.now();
		let mut store = self.store.write();

		match store.get(identifier, now) {
			None => {
				// First request of a window is always admitted, even with
				// a limit of zero
				let reset_at = Timestamp(now.0 + window.as_millis() as i64);
				store.insert(identifier, RateLimitRecord { count: 1, reset_at });
				RateLimitDecision { allowed: true, remaining: limit.saturating_sub(1), reset_at }
			}
			Some(record) if record.count >= limit => {
				// Denied attempts leave the record untouched
				self.total_denied.fetch_add(1, Ordering::Relaxed);
				debug!("Rate limited {} until {}", identifier, record.reset_at);
				RateLimitDecision { allowed: false, remaining: 0, reset_at: record.reset_at }
			}
			Some(record) => {
				let count = record.count.saturating_add(1);
				store.insert(identifier, RateLimitRecord { count, reset_at: record.reset_at });
				RateLimitDecision {
					allowed: true,
					remaining: limit.saturating_sub(count),
					reset_at: record.reset_at,
				}
			}
		}
	}

	/// Quota state for an identifier with the configured default limit
	pub fn status(&self, identifier: &str) -> RateLimitStatus {
		self.status_with(identifier, self.config.limit)
	}

	/// Quota state for an identifier against an explicit limit.
	///
	/// Never creates or mutates a record; asking about an identifier is
	/// free.
	pub fn status_with(&self, identifier: &str, limit: u32) -> RateLimitStatus {
		let now = self.clock.now();

		match self.store.read().get(identifier, now) {
			Some(record) => RateLimitStatus {
				remaining: limit.saturating_sub(record.count),
				reset_at: Some(record.reset_at),
			},
			None => RateLimitStatus { remaining: limit, reset_at: None },
		}
	}

	/// Forget an identifier's current window
	pub fn reset(&self, identifier: &str) {
		self.store.write().remove(identifier);
	}

	/// Remove expired records now, returning how many were deleted
	pub fn sweep(&self) -> usize {
		let now = self.clock.now();
		let removed = self.store.write().sweep(now);
		if removed > 0 {
			debug!("Swept {} expired rate limit records", removed);
		}
		removed
	}

	/// Spawn the periodic background sweep for this limiter.
	///
	/// Must be called from within a Tokio runtime. Calling it again
	/// replaces the previous sweeper.
	pub fn spawn_sweeper(&self) {
		let store = Arc::clone(&self.store);
		let clock = Arc::clone(&self.clock);
		let period = self.config.sweep_interval;

		let handle = tokio::spawn(async move {
			let mut interval = tokio::time::interval(period);
			// The first tick completes immediately; skip it
			interval.tick().await;

			loop {
				interval.tick().await;

				let now = clock.now();
				let removed = store.write().sweep(now);
				if removed > 0 {
					debug!("Swept {} expired rate limit records", removed);
				}
			}
		});

		if let Some(old) = self.sweeper.lock().replace(handle) {
			old.abort();
		}
	}

	/// Stop the background sweeper, if one is running
	pub fn shutdown(&self) {
		if let Some(handle) = self.sweeper.lock().take() {
			handle.abort();
		}
	}

	/// The identifier resolver configured for this limiter
	pub fn resolver(&self) -> &IdentifierResolver {
		&self.resolver
	}

	/// Current time as seen by this limiter's time source
	pub fn now(&self) -> Timestamp {
		self.clock.now()
	}

	/// Activity counters
	pub fn stats(&self) -> AdmissionStats {
		AdmissionStats {
			tracked_identifiers: self.store.read().len(),
			total_denied: self.total_denied.load(Ordering::Relaxed),
			total_unattributed: self.resolver.unattributed_count(),
		}
	}
}

impl Default for RateLimiter {
	fn default() -> Self {
		Self::new(RateLimitConfig::default())
	}
}

impl Drop for RateLimiter {
	fn drop(&mut self) {
		self.shutdown();
	}
}


// vim: ts=4
