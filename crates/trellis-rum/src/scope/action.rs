// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scope tracking one user action.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use trellis_rum_core::{
	ActionId, ActionKind, ActionRecord, Attributes, RawEvent, RumContext, RumRecord, ScopeKey,
	ViewId,
};

use super::{ScopeOutcome, Services};
use crate::sink::RecordSink;

/// One user action with two independent closing clocks.
///
/// Inactivity is measured from the last relevant interaction (resource
/// start/stop, view-tree change), not from the action start; the max
/// duration clock runs from the start and closes the action even with
/// resources still pending. The waiting set holds non-owning resource keys
/// and is pruned on every event.
pub(crate) struct ActionScope {
	svc: Arc<Services>,
	id: ActionId,
	view_id: ViewId,
	context: RumContext,
	kind: ActionKind,
	name: String,
	wait_for_stop: bool,
	attributes: Attributes,
	started_at: Duration,
	started_wall: DateTime<Utc>,
	last_interaction: Duration,
	waiting: HashSet<ScopeKey>,
	resource_count: u64,
	error_count: u64,
	view_tree_changes: u64,
	closed: bool,
}

impl ActionScope {
	pub(crate) fn new(
		svc: Arc<Services>,
		context: RumContext,
		view_id: ViewId,
		id: ActionId,
		kind: ActionKind,
		name: String,
		wait_for_stop: bool,
		attributes: Attributes,
	) -> Self {
		let started_at = svc.now();
		let started_wall = svc.clock.wall();
		Self {
			svc,
			id,
			view_id,
			context,
			kind,
			name,
			wait_for_stop,
			attributes,
			started_at,
			started_wall,
			last_interaction: started_at,
			waiting: HashSet::new(),
			resource_count: 0,
			error_count: 0,
			view_tree_changes: 0,
			closed: false,
		}
	}

	pub(crate) fn id(&self) -> ActionId {
		self.id
	}

	pub(crate) fn handle_event(
		&mut self,
		event: &RawEvent,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) -> ScopeOutcome {
		let now = self.svc.now();
		let keys = &self.svc.keys;
		self.waiting.retain(|key| keys.is_alive(*key));

		let inactive =
			now.saturating_sub(self.last_interaction) >= self.svc.config.action_inactivity;
		let timed_out = now.saturating_sub(self.started_at) >= self.svc.config.action_max_duration;

		if inactive && self.waiting.is_empty() && !self.wait_for_stop {
			// Nothing left to wait for; the action effectively ended at its
			// last interaction.
			self.close(self.last_interaction, sink, feedback);
		} else if timed_out {
			self.close(now, sink, feedback);
		} else {
			self.process(event, now, sink, feedback);
		}

		if self.closed {
			ScopeOutcome::Finished
		} else {
			ScopeOutcome::Continue
		}
	}

	fn process(
		&mut self,
		event: &RawEvent,
		now: Duration,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) {
		match event {
			RawEvent::ViewTreeChanged => {
				self.view_tree_changes += 1;
				self.last_interaction = now;
			}
			RawEvent::StartResource { key, .. } => {
				self.waiting.insert(*key);
				self.resource_count += 1;
				self.last_interaction = now;
			}
			RawEvent::StopResource { key, .. } => {
				if self.waiting.remove(key) {
					self.last_interaction = now;
				}
			}
			RawEvent::StopResourceWithError { key, .. } => {
				if self.waiting.remove(key) {
					self.error_count += 1;
					self.last_interaction = now;
				}
			}
			RawEvent::AddError { is_fatal, .. } => {
				self.error_count += 1;
				if *is_fatal {
					self.close(now, sink, feedback);
				}
			}
			RawEvent::StopAction { name, attributes } => {
				self.name = name.clone();
				self.attributes.extend(attributes.clone());
				self.close(now, sink, feedback);
			}
			RawEvent::StartView { .. } | RawEvent::StopView { .. } => {
				// The owning view is going away; stop waiting on anything.
				self.waiting.clear();
				self.close(now, sink, feedback);
			}
			_ => {}
		}
	}

	fn close(&mut self, end: Duration, sink: &dyn RecordSink, feedback: &mut Vec<RawEvent>) {
		if self.closed {
			return;
		}
		self.closed = true;

		let significant =
			self.resource_count > 0 || self.view_tree_changes > 0 || self.error_count > 0;
		if !significant {
			debug!(
				action_id = %self.id,
				name = %self.name,
				"action had no observable effect, dropping"
			);
			feedback.push(RawEvent::DroppedAction {
				view_id: self.view_id,
			});
			return;
		}

		let duration = end.saturating_sub(self.started_at);
		let record = ActionRecord {
			id: self.id,
			kind: self.kind,
			name: self.name.clone(),
			timestamp: self.started_wall,
			duration_ns: duration.as_nanos() as u64,
			resource_count: self.resource_count,
			error_count: self.error_count,
			view_tree_change_count: self.view_tree_changes,
			attributes: self.attributes.clone(),
		};
		sink.write(RumRecord::Action(record), &self.context);
		feedback.push(RawEvent::SentAction {
			view_id: self.view_id,
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scope::testing::{harness, Harness};
	use trellis_rum_core::{ErrorOrigin, HttpMethod, ResourceKind, SessionId, SessionState};

	fn create_test_action(h: &Harness, wait_for_stop: bool) -> (ActionScope, ViewId) {
		let view_id = ViewId::new();
		let id = ActionId::new();
		let context = RumContext::new("app-test")
			.with_session(SessionId::new(), SessionState::Tracked)
			.with_view(view_id, "Home")
			.with_action(Some(id));
		let scope = ActionScope::new(
			h.services.clone(),
			context,
			view_id,
			id,
			ActionKind::Tap,
			"submit".to_string(),
			wait_for_stop,
			Attributes::new(),
		);
		(scope, view_id)
	}

	fn start_resource(key: ScopeKey) -> RawEvent {
		RawEvent::StartResource {
			key,
			url: "https://api.example.com/orders".to_string(),
			method: HttpMethod::Post,
			attributes: Attributes::new(),
		}
	}

	fn stop_resource(key: ScopeKey) -> RawEvent {
		RawEvent::StopResource {
			key,
			kind: ResourceKind::Fetch,
			status_code: Some(200),
			size_bytes: None,
			attributes: Attributes::new(),
		}
	}

	fn action_records(h: &Harness) -> Vec<ActionRecord> {
		h.sink
			.records()
			.into_iter()
			.filter_map(|(record, _)| match record {
				RumRecord::Action(a) => Some(a),
				_ => None,
			})
			.collect()
	}

	#[test]
	fn test_inactivity_closes_at_last_interaction() {
		let h = harness();
		let (mut scope, _) = create_test_action(&h, false);
		let mut feedback = Vec::new();

		scope.handle_event(&RawEvent::ViewTreeChanged, &h.sink, &mut feedback);
		h.clock.advance(Duration::from_millis(150));
		let outcome = scope.handle_event(&RawEvent::KeepAlive, &h.sink, &mut feedback);

		assert_eq!(outcome, ScopeOutcome::Finished);
		let records = action_records(&h);
		assert_eq!(records.len(), 1);
		// Closed at the last interaction (t=0), not at t=150ms.
		assert_eq!(records[0].duration_ns, 0);
		assert_eq!(records[0].view_tree_change_count, 1);
	}

	#[test]
	fn test_pending_resource_blocks_inactivity_close() {
		let h = harness();
		let key = h.keys.issue();
		let (mut scope, _) = create_test_action(&h, false);
		let mut feedback = Vec::new();

		scope.handle_event(&start_resource(key), &h.sink, &mut feedback);
		h.clock.advance(Duration::from_millis(500));
		let outcome = scope.handle_event(&RawEvent::KeepAlive, &h.sink, &mut feedback);

		// Inactive but a resource is pending and max duration not reached.
		assert_eq!(outcome, ScopeOutcome::Continue);
		assert!(action_records(&h).is_empty());
	}

	#[test]
	fn test_max_duration_closes_despite_pending_resource() {
		let h = harness();
		let key = h.keys.issue();
		let (mut scope, _) = create_test_action(&h, false);
		let mut feedback = Vec::new();

		scope.handle_event(&start_resource(key), &h.sink, &mut feedback);
		h.clock.advance(Duration::from_secs(10));
		let outcome = scope.handle_event(&RawEvent::KeepAlive, &h.sink, &mut feedback);

		assert_eq!(outcome, ScopeOutcome::Finished);
		let records = action_records(&h);
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].duration_ns, Duration::from_secs(10).as_nanos() as u64);
		assert_eq!(records[0].resource_count, 1);
	}

	#[test]
	fn test_resource_stop_refreshes_inactivity_clock() {
		let h = harness();
		let key = h.keys.issue();
		let (mut scope, _) = create_test_action(&h, false);
		let mut feedback = Vec::new();

		scope.handle_event(&start_resource(key), &h.sink, &mut feedback);
		h.clock.advance(Duration::from_millis(90));
		scope.handle_event(&stop_resource(key), &h.sink, &mut feedback);
		h.clock.advance(Duration::from_millis(90));
		// 180ms since start but only 90ms since the stop refreshed the clock.
		let outcome = scope.handle_event(&RawEvent::ViewTreeChanged, &h.sink, &mut feedback);
		assert_eq!(outcome, ScopeOutcome::Continue);

		h.clock.advance(Duration::from_millis(100));
		let outcome = scope.handle_event(&RawEvent::KeepAlive, &h.sink, &mut feedback);
		assert_eq!(outcome, ScopeOutcome::Finished);
		assert_eq!(action_records(&h)[0].resource_count, 1);
	}

	#[test]
	fn test_reclaimed_resource_key_is_pruned_from_waiting_set() {
		let h = harness();
		let key = h.keys.issue();
		let (mut scope, _) = create_test_action(&h, false);
		let mut feedback = Vec::new();

		scope.handle_event(&start_resource(key), &h.sink, &mut feedback);
		h.keys.retire(key);
		h.clock.advance(Duration::from_millis(150));
		// The reclaimed key no longer blocks the inactivity close.
		let outcome = scope.handle_event(&RawEvent::KeepAlive, &h.sink, &mut feedback);

		assert_eq!(outcome, ScopeOutcome::Finished);
		assert_eq!(action_records(&h).len(), 1);
	}

	#[test]
	fn test_wait_for_stop_blocks_inactivity_close() {
		let h = harness();
		let (mut scope, _) = create_test_action(&h, true);
		let mut feedback = Vec::new();

		scope.handle_event(&RawEvent::ViewTreeChanged, &h.sink, &mut feedback);
		h.clock.advance(Duration::from_secs(1));
		let outcome = scope.handle_event(&RawEvent::KeepAlive, &h.sink, &mut feedback);
		assert_eq!(outcome, ScopeOutcome::Continue);

		let stop = RawEvent::StopAction {
			name: "submit_order".to_string(),
			attributes: Attributes::new(),
		};
		let outcome = scope.handle_event(&stop, &h.sink, &mut feedback);
		assert_eq!(outcome, ScopeOutcome::Finished);

		let records = action_records(&h);
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].name, "submit_order");
	}

	#[test]
	fn test_silent_action_closes_without_emitting() {
		let h = harness();
		let (mut scope, view_id) = create_test_action(&h, false);
		let mut feedback = Vec::new();

		h.clock.advance(Duration::from_millis(150));
		let outcome = scope.handle_event(&RawEvent::KeepAlive, &h.sink, &mut feedback);

		assert_eq!(outcome, ScopeOutcome::Finished);
		assert!(h.sink.is_empty());
		assert!(matches!(
			feedback[0],
			RawEvent::DroppedAction { view_id: v } if v == view_id
		));
	}

	#[test]
	fn test_view_stop_clears_waiting_set_and_closes() {
		let h = harness();
		let key = h.keys.issue();
		let (mut scope, _) = create_test_action(&h, false);
		let mut feedback = Vec::new();

		scope.handle_event(&start_resource(key), &h.sink, &mut feedback);
		let stop_view = RawEvent::StopView {
			key: h.keys.issue(),
			attributes: Attributes::new(),
		};
		let outcome = scope.handle_event(&stop_view, &h.sink, &mut feedback);

		assert_eq!(outcome, ScopeOutcome::Finished);
		assert_eq!(action_records(&h).len(), 1);
	}

	#[test]
	fn test_fatal_error_closes_immediately() {
		let h = harness();
		let (mut scope, _) = create_test_action(&h, false);
		let mut feedback = Vec::new();

		let error = RawEvent::AddError {
			message: "segfault".to_string(),
			origin: ErrorOrigin::Source,
			error_kind: None,
			is_fatal: true,
			attributes: Attributes::new(),
		};
		let outcome = scope.handle_event(&error, &h.sink, &mut feedback);

		assert_eq!(outcome, ScopeOutcome::Finished);
		let records = action_records(&h);
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].error_count, 1);
	}

	#[test]
	fn test_emission_happens_at_most_once() {
		let h = harness();
		let (mut scope, _) = create_test_action(&h, false);
		let mut feedback = Vec::new();

		scope.handle_event(&RawEvent::ViewTreeChanged, &h.sink, &mut feedback);
		let stop = RawEvent::StopAction {
			name: "submit".to_string(),
			attributes: Attributes::new(),
		};
		scope.handle_event(&stop, &h.sink, &mut feedback);
		scope.handle_event(&stop, &h.sink, &mut feedback);

		assert_eq!(action_records(&h).len(), 1);
	}
}
