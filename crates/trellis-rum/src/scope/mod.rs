// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The event aggregation tree.
//!
//! A fixed-depth tree of scopes: application → session → view router →
//! views → action/resources. Every raw event enters at the application
//! scope and is pushed down exactly one path per level; each level forwards
//! to its children first, then applies its own transition, and reports
//! whether it is still alive. Only scopes that build a record call the sink,
//! synchronously, within the same processing turn.

pub(crate) mod action;
pub(crate) mod application;
pub(crate) mod resource;
pub(crate) mod router;
pub(crate) mod session;
pub(crate) mod view;

use std::sync::Arc;

use trellis_rum_core::{KeyLiveness, RawEvent};

use crate::clock::Clock;
use crate::config::RumConfig;
use crate::observer::CurrentSession;
use crate::process::ProcessContext;

/// Result of one scope processing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeOutcome {
	/// The scope is still alive
	Continue,
	/// The scope finished; the parent must detach it
	Finished,
}

/// Shared collaborators handed to every scope at construction.
#[derive(Debug)]
pub(crate) struct Services {
	pub(crate) config: RumConfig,
	pub(crate) clock: Arc<dyn Clock>,
	pub(crate) keys: Arc<dyn KeyLiveness>,
	pub(crate) process: Arc<dyn ProcessContext>,
	pub(crate) current_session: Arc<CurrentSession>,
}

impl Services {
	/// Monotonic reading, shorthand used on every event.
	pub(crate) fn now(&self) -> std::time::Duration {
		self.clock.elapsed()
	}
}

/// Event kinds allowed to synthesize the implicit app-launch view.
pub(crate) fn is_app_launch_event(event: &RawEvent) -> bool {
	matches!(
		event,
		RawEvent::StartAction { .. }
			| RawEvent::StartResource { .. }
			| RawEvent::AddError { .. }
			| RawEvent::ApplicationStarted { .. }
	)
}

/// Event kinds allowed to synthesize the implicit background view, and to
/// silently renew an expired session when background tracking is enabled.
pub(crate) fn is_background_event(event: &RawEvent) -> bool {
	matches!(
		event,
		RawEvent::StartAction { .. } | RawEvent::StartResource { .. } | RawEvent::AddError { .. }
	)
}

/// Event kinds that are safe to ignore when no view is active.
pub(crate) fn is_silent_orphan_event(event: &RawEvent) -> bool {
	matches!(
		event,
		RawEvent::ApplicationStarted { .. }
			| RawEvent::KeepAlive
			| RawEvent::ResetSession
			| RawEvent::StopView { .. }
			| RawEvent::StopAction { .. }
			| RawEvent::SentResource { .. }
			| RawEvent::SentAction { .. }
			| RawEvent::SentError { .. }
			| RawEvent::DroppedResource { .. }
			| RawEvent::DroppedAction { .. }
	)
}

#[cfg(test)]
pub(crate) mod testing {
	use std::sync::Arc;

	use trellis_rum_core::KeyArena;

	use super::Services;
	use crate::clock::StepClock;
	use crate::config::RumConfig;
	use crate::observer::CurrentSession;
	use crate::process::HostProcess;
	use crate::sink::MemorySink;

	/// Deterministic collaborators for scope-level tests.
	pub(crate) struct Harness {
		pub(crate) services: Arc<Services>,
		pub(crate) clock: Arc<StepClock>,
		pub(crate) keys: Arc<KeyArena>,
		pub(crate) process: Arc<HostProcess>,
		pub(crate) sink: MemorySink,
	}

	pub(crate) fn harness() -> Harness {
		harness_with(RumConfig::default())
	}

	pub(crate) fn harness_with(config: RumConfig) -> Harness {
		let clock = Arc::new(StepClock::new());
		let keys = Arc::new(KeyArena::new());
		let process = Arc::new(HostProcess::new(true));
		let services = Arc::new(Services {
			config,
			clock: clock.clone(),
			keys: keys.clone(),
			process: process.clone(),
			current_session: Arc::new(CurrentSession::new("app-test")),
		});
		Harness {
			services,
			clock,
			keys,
			process,
			sink: MemorySink::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use trellis_rum_core::Attributes;

	#[test]
	fn test_policy_tables_are_disjoint_where_it_matters() {
		// An event must never be both orphan-eligible and silent.
		let start_action = RawEvent::StartAction {
			kind: trellis_rum_core::ActionKind::Tap,
			name: "tap".to_string(),
			wait_for_stop: false,
			attributes: Attributes::new(),
		};
		assert!(is_app_launch_event(&start_action));
		assert!(is_background_event(&start_action));
		assert!(!is_silent_orphan_event(&start_action));

		assert!(is_silent_orphan_event(&RawEvent::KeepAlive));
		assert!(!is_background_event(&RawEvent::KeepAlive));
	}

	#[test]
	fn test_application_started_is_app_launch_but_not_background() {
		let event = RawEvent::ApplicationStarted {
			startup_duration: std::time::Duration::from_millis(100),
		};
		assert!(is_app_launch_event(&event));
		assert!(!is_background_event(&event));
		assert!(is_silent_orphan_event(&event));
	}
}
