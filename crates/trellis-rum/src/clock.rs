// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Injected time source for the aggregation tree.
//!
//! Every time check in the tree is a non-blocking read of this port; tests
//! substitute [`StepClock`] to drive the window-based closing policies
//! deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Monotonic + wall-clock time source.
pub trait Clock: Send + Sync + std::fmt::Debug {
	/// Monotonic time since an arbitrary fixed origin.
	fn elapsed(&self) -> Duration;

	/// Wall-clock time, used only for record timestamps.
	fn wall(&self) -> DateTime<Utc>;
}

/// Production clock anchored to an [`Instant`] taken at construction.
#[derive(Debug)]
pub struct SystemClock {
	origin: Instant,
}

impl SystemClock {
	#[must_use]
	pub fn new() -> Self {
		Self {
			origin: Instant::now(),
		}
	}
}

impl Default for SystemClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for SystemClock {
	fn elapsed(&self) -> Duration {
		self.origin.elapsed()
	}

	fn wall(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// Manually advanced clock for tests and simulations.
///
/// Starts at zero; `advance` moves both the monotonic reading and the
/// derived wall clock. Atomic so a test can hold a handle while the monitor
/// owns another.
#[derive(Debug)]
pub struct StepClock {
	nanos: AtomicU64,
	epoch: DateTime<Utc>,
}

impl StepClock {
	#[must_use]
	pub fn new() -> Self {
		Self {
			nanos: AtomicU64::new(0),
			epoch: Utc::now(),
		}
	}

	pub fn advance(&self, by: Duration) {
		self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
	}
}

impl Default for StepClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for StepClock {
	fn elapsed(&self) -> Duration {
		Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
	}

	fn wall(&self) -> DateTime<Utc> {
		self.epoch + chrono::Duration::nanoseconds(self.nanos.load(Ordering::SeqCst) as i64)
	}
}
