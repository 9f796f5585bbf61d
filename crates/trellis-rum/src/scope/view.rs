// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scope tracking one view's lifetime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use trellis_rum_core::{
	ActionId, ActionKind, ActionRecord, Attributes, ErrorOrigin, ErrorRecord, RawEvent,
	RumContext, RumRecord, ScopeKey, ViewId, ViewRecord,
};

use super::action::ActionScope;
use super::resource::ResourceScope;
use super::{ScopeOutcome, Services};
use crate::sink::RecordSink;

/// Snapshot urgency decided while processing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Update {
	None,
	/// Emit only if the per-view throttle window has elapsed
	Throttled,
	/// Emit regardless of the throttle window
	Forced,
}

/// One view's lifetime, from start until stopped with nothing outstanding.
///
/// Unlike the leaf scopes a view emits repeatedly: every snapshot carries a
/// growing version and the latest one supersedes the rest downstream. The
/// pending counters track child emissions that have not yet been
/// acknowledged by their `Sent*`/`Dropped*` events; the view only reports
/// itself finished once stopped with every counter settled.
pub(crate) struct ViewScope {
	svc: Arc<Services>,
	/// None for synthesized (app-launch/background) views
	key: Option<ScopeKey>,
	id: ViewId,
	name: String,
	attributes: Attributes,
	started_at: Duration,
	started_wall: DateTime<Utc>,
	stopped: bool,
	stopped_at: Option<Duration>,
	version: u64,
	action: Option<ActionScope>,
	resources: HashMap<ScopeKey, ResourceScope>,
	action_count: u64,
	resource_count: u64,
	error_count: u64,
	crash_count: u64,
	pending_actions: u32,
	pending_resources: u32,
	pending_errors: u32,
	/// Throttle anchor; starts at view creation
	last_snapshot_at: Duration,
}

impl ViewScope {
	pub(crate) fn new(
		svc: Arc<Services>,
		key: Option<ScopeKey>,
		name: String,
		attributes: Attributes,
	) -> Self {
		let started_at = svc.now();
		let started_wall = svc.clock.wall();
		Self {
			svc,
			key,
			id: ViewId::new(),
			name,
			attributes,
			started_at,
			started_wall,
			stopped: false,
			stopped_at: None,
			version: 1,
			action: None,
			resources: HashMap::new(),
			action_count: 0,
			resource_count: 0,
			error_count: 0,
			crash_count: 0,
			pending_actions: 0,
			pending_resources: 0,
			pending_errors: 0,
			last_snapshot_at: started_at,
		}
	}

	/// True until the view has been stopped (explicitly or implicitly).
	pub(crate) fn is_active(&self) -> bool {
		!self.stopped
	}

	pub(crate) fn name(&self) -> &str {
		&self.name
	}

	pub(crate) fn handle_event(
		&mut self,
		event: &RawEvent,
		parent_ctx: &RumContext,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) -> ScopeOutcome {
		let now = self.svc.now();

		// The key reference resolves lazily; a reclaimed key is an
		// authoritative stop.
		let mut update = Update::None;
		if !self.stopped {
			if let Some(key) = self.key {
				if !self.svc.keys.is_alive(key) {
					debug!(view_id = %self.id, name = %self.name, "view key reclaimed, stopping");
					self.stop(now);
					update = Update::Forced;
				}
			}
		}

		let had_action = self.action.is_some();
		self.delegate_to_children(event, sink, feedback);

		match event {
			RawEvent::StartView { .. } => {
				// A new view is taking over; this one stops without a key match.
				if !self.stopped {
					self.stop(now);
					update = Update::Forced;
				}
			}
			RawEvent::StopView { key, attributes } => {
				if !self.stopped && self.key == Some(*key) {
					self.attributes.extend(attributes.clone());
					self.stop(now);
					update = Update::Forced;
				}
			}
			RawEvent::StartAction {
				kind,
				name,
				wait_for_stop,
				attributes,
			} => {
				if self.stopped {
					debug!(name = %name, "action started under a stopped view, ignoring");
				} else if self.action.is_some() {
					debug!(name = %name, "an action is already active, ignoring");
				} else {
					let action_id = ActionId::new();
					let context = self.context(parent_ctx).with_action(Some(action_id));
					self.action = Some(ActionScope::new(
						self.svc.clone(),
						context,
						self.id,
						action_id,
						*kind,
						name.clone(),
						*wait_for_stop,
						attributes.clone(),
					));
					self.pending_actions += 1;
				}
			}
			RawEvent::StopAction { name, .. } => {
				if !had_action && !self.stopped {
					debug!(name = %name, "stop for an action that isn't active, ignoring");
				}
			}
			RawEvent::StartResource {
				key,
				url,
				method,
				attributes,
			} => {
				if self.stopped {
					debug!(url = %url, "resource started under a stopped view, ignoring");
				} else if self.resources.contains_key(key) {
					debug!(url = %url, "resource key already tracked, ignoring");
				} else {
					let context = self.context(parent_ctx);
					self.resources.insert(
						*key,
						ResourceScope::new(
							self.svc.clone(),
							context,
							self.id,
							*key,
							url.clone(),
							*method,
							attributes.clone(),
						),
					);
					self.pending_resources += 1;
				}
			}
			RawEvent::AddError {
				message,
				origin,
				error_kind,
				is_fatal,
				attributes,
			} => {
				if self.stopped {
					debug!(message = %message, "error added under a stopped view, dropping");
				} else {
					self.add_error(
						message,
						*origin,
						error_kind.clone(),
						*is_fatal,
						attributes,
						parent_ctx,
						sink,
						feedback,
					);
					if *is_fatal {
						update = Update::Forced;
					}
				}
			}
			RawEvent::ApplicationStarted { startup_duration } => {
				if !self.stopped {
					self.emit_startup_action(*startup_duration, parent_ctx, sink, feedback);
				}
			}
			RawEvent::KeepAlive => {
				if !self.stopped {
					update = Update::Throttled;
				}
			}
			RawEvent::SentAction { view_id } if *view_id == self.id => {
				self.pending_actions = self.pending_actions.saturating_sub(1);
				self.action_count += 1;
				update = Update::Throttled;
			}
			RawEvent::DroppedAction { view_id } if *view_id == self.id => {
				self.pending_actions = self.pending_actions.saturating_sub(1);
			}
			RawEvent::SentResource { view_id } if *view_id == self.id => {
				self.pending_resources = self.pending_resources.saturating_sub(1);
				self.resource_count += 1;
				update = Update::Throttled;
			}
			RawEvent::DroppedResource { view_id } if *view_id == self.id => {
				self.pending_resources = self.pending_resources.saturating_sub(1);
			}
			RawEvent::SentError {
				view_id,
				resource_id,
			} if *view_id == self.id => {
				self.error_count += 1;
				if resource_id.is_some() {
					// The error record replaced a pending resource record.
					self.pending_resources = self.pending_resources.saturating_sub(1);
				} else {
					self.pending_errors = self.pending_errors.saturating_sub(1);
				}
				update = Update::Throttled;
			}
			_ => {}
		}

		let complete = self.is_complete();
		if complete {
			update = Update::Forced;
		}
		if update != Update::None {
			self.emit_snapshot(now, parent_ctx, sink, update == Update::Forced);
		}

		if complete {
			ScopeOutcome::Finished
		} else {
			ScopeOutcome::Continue
		}
	}

	/// Context for records emitted by this view and its children.
	fn context(&self, parent_ctx: &RumContext) -> RumContext {
		parent_ctx
			.clone()
			.with_view(self.id, self.name.clone())
			.with_action(self.action.as_ref().map(ActionScope::id))
	}

	fn delegate_to_children(
		&mut self,
		event: &RawEvent,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) {
		if let Some(action) = self.action.as_mut() {
			if action.handle_event(event, sink, feedback) == ScopeOutcome::Finished {
				self.action = None;
			}
		}
		self.resources
			.retain(|_, resource| resource.handle_event(event, sink, feedback) == ScopeOutcome::Continue);
	}

	fn stop(&mut self, now: Duration) {
		self.stopped = true;
		self.stopped_at = Some(now);
	}

	fn is_complete(&self) -> bool {
		self.stopped
			&& self.action.is_none()
			&& self.resources.is_empty()
			&& self.pending_actions == 0
			&& self.pending_resources == 0
			&& self.pending_errors == 0
	}

	fn add_error(
		&mut self,
		message: &str,
		origin: ErrorOrigin,
		error_kind: Option<String>,
		is_fatal: bool,
		attributes: &Attributes,
		parent_ctx: &RumContext,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) {
		let record = ErrorRecord {
			message: message.to_string(),
			origin,
			error_kind,
			is_crash: is_fatal,
			resource: None,
			timestamp: self.svc.clock.wall(),
			attributes: attributes.clone(),
		};
		sink.write(RumRecord::Error(record), &self.context(parent_ctx));

		if is_fatal {
			// The process is likely about to die; settle the counters now
			// instead of waiting for a feedback turn that may never come.
			self.error_count += 1;
			self.crash_count += 1;
		} else {
			self.pending_errors += 1;
			feedback.push(RawEvent::SentError {
				view_id: self.id,
				resource_id: None,
			});
		}
	}

	fn emit_startup_action(
		&mut self,
		startup: Duration,
		parent_ctx: &RumContext,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) {
		let action_id = ActionId::new();
		let record = ActionRecord {
			id: action_id,
			kind: ActionKind::ApplicationStart,
			name: "application_start".to_string(),
			timestamp: self.svc.clock.wall(),
			duration_ns: startup.as_nanos() as u64,
			resource_count: 0,
			error_count: 0,
			view_tree_change_count: 0,
			attributes: Attributes::new(),
		};
		let context = self.context(parent_ctx).with_action(Some(action_id));
		sink.write(RumRecord::Action(record), &context);
		self.pending_actions += 1;
		feedback.push(RawEvent::SentAction { view_id: self.id });
	}

	fn emit_snapshot(
		&mut self,
		now: Duration,
		parent_ctx: &RumContext,
		sink: &dyn RecordSink,
		force: bool,
	) {
		let due =
			now.saturating_sub(self.last_snapshot_at) >= self.svc.config.view_update_interval;
		if !force && !due {
			return;
		}

		let end = self.stopped_at.unwrap_or(now);
		let record = ViewRecord {
			id: self.id,
			name: self.name.clone(),
			timestamp: self.started_wall,
			duration_ns: end.saturating_sub(self.started_at).as_nanos() as u64,
			version: self.version,
			action_count: self.action_count,
			resource_count: self.resource_count,
			error_count: self.error_count,
			crash_count: self.crash_count,
			is_active: !self.stopped,
			attributes: self.attributes.clone(),
		};
		sink.write(RumRecord::View(record), &self.context(parent_ctx));
		self.version += 1;
		self.last_snapshot_at = now;
	}
}
