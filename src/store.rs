//! Fixed-Window Counter Store
//!
//! Keeps one admission record per client identifier. Records are never
//! expired on read: a lookup whose window has ended reports the record as
//! absent while the entry still sits in the map, so decisions stay correct
//! even if the sweeper never runs. Physical removal is the sweeper's job.
//!
//! The store is a plain map; the [`RateLimiter`](crate::limiter::RateLimiter)
//! wraps it in a lock so each decision is a single atomic read-decide-write.

use std::collections::HashMap;

use crate::types::Timestamp;

/// Admission record for one identifier within one fixed window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitRecord {
	/// Admitted requests in the current window; starts at 1 on creation
	pub count: u32,
	/// When the window ends (milliseconds since epoch)
	pub reset_at: Timestamp,
}

/// In-memory store of per-identifier admission records
#[derive(Debug, Default)]
pub struct CounterStore {
	records: HashMap<Box<str>, RateLimitRecord>,
}

impl CounterStore {
	/// Create an empty store
	pub fn new() -> Self {
		Self { records: HashMap::new() }
	}

	/// Record for `identifier` if its window is still open at `now`
	pub fn get(&self, identifier: &str, now: Timestamp) -> Option<RateLimitRecord> {
		self.records.get(identifier).filter(|record| record.reset_at > now).copied()
	}

	/// Store or replace the record for `identifier`
	pub fn insert(&mut self, identifier: &str, record: RateLimitRecord) {
		self.records.insert(identifier.into(), record);
	}

	/// Remove the record for `identifier`, expired or not
	pub fn remove(&mut self, identifier: &str) {
		self.records.remove(identifier);
	}

	/// Delete every record whose window ended before `now`.
	///
	/// Returns the number of records removed.
	pub fn sweep(&mut self, now: Timestamp) -> usize {
		let before = self.records.len();
		self.records.retain(|_, record| record.reset_at >= now);
		before - self.records.len()
	}

	/// Number of records held, expired ones included
	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}


// vim: ts=4
