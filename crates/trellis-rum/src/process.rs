// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Host process state queried by the view router.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Foreground/background and first-view signals from the host process.
///
/// The router consults these when an event arrives with no active view, and
/// when deciding whether to synthesize the application-start timing into the
/// first view.
pub trait ProcessContext: Send + Sync + std::fmt::Debug {
	/// True while the process is in the foreground.
	fn is_foreground(&self) -> bool;

	/// True once any view has ever been shown in this process.
	fn first_view_shown(&self) -> bool;

	/// Latches the first-view flag; called by the router on the first view.
	fn mark_first_view_shown(&self);

	/// Time from process start to now, used for the startup action.
	fn startup_duration(&self) -> Duration;
}

/// Default [`ProcessContext`] backed by atomics.
///
/// The host flips `set_foreground` from its lifecycle hooks and records the
/// startup latency once it is known.
#[derive(Debug)]
pub struct HostProcess {
	foreground: AtomicBool,
	first_view: AtomicBool,
	startup_ns: AtomicU64,
}

impl HostProcess {
	#[must_use]
	pub fn new(foreground: bool) -> Self {
		Self {
			foreground: AtomicBool::new(foreground),
			first_view: AtomicBool::new(false),
			startup_ns: AtomicU64::new(0),
		}
	}

	pub fn set_foreground(&self, foreground: bool) {
		self.foreground.store(foreground, Ordering::SeqCst);
	}

	pub fn set_startup_duration(&self, startup: Duration) {
		self.startup_ns
			.store(startup.as_nanos() as u64, Ordering::SeqCst);
	}
}

impl Default for HostProcess {
	fn default() -> Self {
		Self::new(true)
	}
}

impl ProcessContext for HostProcess {
	fn is_foreground(&self) -> bool {
		self.foreground.load(Ordering::SeqCst)
	}

	fn first_view_shown(&self) -> bool {
		self.first_view.load(Ordering::SeqCst)
	}

	fn mark_first_view_shown(&self) {
		self.first_view.store(true, Ordering::SeqCst);
	}

	fn startup_duration(&self) -> Duration {
		Duration::from_nanos(self.startup_ns.load(Ordering::SeqCst))
	}
}
