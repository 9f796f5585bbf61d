// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Downstream sink for aggregated records.

use std::sync::Mutex;

use trellis_rum_core::{RumContext, RumRecord};

/// Receiver for completed records.
///
/// Called synchronously within the event-processing turn; implementations
/// must not block and must not panic. Failures are the sink's own concern.
pub trait RecordSink: Send + Sync {
	fn write(&self, record: RumRecord, context: &RumContext);
}

/// Sink that discards everything.
///
/// Substituted by the session node while the session is not tracked, so
/// children keep computing state without emitting.
#[derive(Debug, Default)]
pub struct NoopSink;

impl RecordSink for NoopSink {
	fn write(&self, _record: RumRecord, _context: &RumContext) {}
}

/// Sink collecting records in memory, for tests and buffering hosts.
#[derive(Debug, Default)]
pub struct MemorySink {
	records: Mutex<Vec<(RumRecord, RumContext)>>,
}

impl MemorySink {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Snapshot of everything written so far.
	#[must_use]
	pub fn records(&self) -> Vec<(RumRecord, RumContext)> {
		self.records.lock().expect("memory sink poisoned").clone()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.records.lock().expect("memory sink poisoned").len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn clear(&self) {
		self.records.lock().expect("memory sink poisoned").clear();
	}
}

impl RecordSink for MemorySink {
	fn write(&self, record: RumRecord, context: &RumContext) {
		self.records
			.lock()
			.expect("memory sink poisoned")
			.push((record, context.clone()));
	}
}
