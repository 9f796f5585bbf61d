// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scope owning session identity, sampling, and expiry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use trellis_rum_core::{RawEvent, RumContext, RumRecord, SessionId, SessionRecord, SessionState};

use super::router::ViewRouterScope;
use super::{is_background_event, ScopeOutcome, Services};
use crate::sample::Sampler;
use crate::sink::{NoopSink, RecordSink};

static NOOP_SINK: NoopSink = NoopSink;

/// Session state machine over `{NotTracked, Tracked, Expired}`.
///
/// Renewal draws a new random id and a fresh sampling decision. While the
/// session is not tracked, events still flow to the children (so in-memory
/// counters stay consistent) but through a no-op sink. Every renewal is
/// published to the process-wide current-session observer atomically, within
/// the same serialized turn.
pub(crate) struct SessionScope {
	svc: Arc<Services>,
	sampler: Box<dyn Sampler>,
	session_id: SessionId,
	state: SessionState,
	/// Result of the sampling draw, retained across the Expired transition
	kept: bool,
	started_at: Duration,
	started_wall: DateTime<Utc>,
	last_interaction: Duration,
	router: ViewRouterScope,
}

impl SessionScope {
	pub(crate) fn new(svc: Arc<Services>, sampler: Box<dyn Sampler>) -> Self {
		let now = svc.now();
		let started_wall = svc.clock.wall();
		let router = ViewRouterScope::new(svc.clone());
		Self {
			svc,
			sampler,
			session_id: SessionId::nil(),
			state: SessionState::NotTracked,
			kept: false,
			started_at: now,
			started_wall,
			last_interaction: now,
			router,
		}
	}

	pub(crate) fn handle_event(
		&mut self,
		event: &RawEvent,
		ctx: &RumContext,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) -> ScopeOutcome {
		self.update_state(event, ctx, sink);

		let child_ctx = ctx.clone().with_session(self.session_id, self.state);
		let writer: &dyn RecordSink = if self.state == SessionState::Tracked {
			sink
		} else {
			&NOOP_SINK
		};
		let _ = self.router.handle_event(event, &child_ctx, writer, feedback);

		// The session is replaced on renewal, never detached.
		ScopeOutcome::Continue
	}

	fn update_state(&mut self, event: &RawEvent, ctx: &RumContext, sink: &dyn RecordSink) {
		let now = self.svc.now();
		let expired =
			now.saturating_sub(self.last_interaction) >= self.svc.config.session_inactivity;
		let timed_out =
			now.saturating_sub(self.started_at) >= self.svc.config.session_max_duration;

		if matches!(event, RawEvent::ResetSession) {
			self.renew(now, ctx, sink);
		} else if self.session_id.is_nil() {
			self.renew(now, ctx, sink);
		} else if event.is_interaction() {
			if expired || timed_out {
				self.renew(now, ctx, sink);
			}
			self.last_interaction = now;
		} else if expired {
			if self.svc.config.track_background_events && is_background_event(event) {
				self.renew(now, ctx, sink);
			} else {
				self.state = SessionState::Expired;
			}
		} else if timed_out {
			self.renew(now, ctx, sink);
		}
	}

	/// Replaces the session identity and redraws the sampling decision.
	fn renew(&mut self, now: Duration, ctx: &RumContext, sink: &dyn RecordSink) {
		self.emit_completed(now, ctx, sink);

		self.session_id = SessionId::new();
		self.started_at = now;
		self.started_wall = self.svc.clock.wall();
		self.last_interaction = now;
		self.kept = self.sampler.draw() < self.svc.config.sample_rate;
		self.state = if self.kept {
			SessionState::Tracked
		} else {
			SessionState::NotTracked
		};

		self.svc
			.current_session
			.publish(ctx.clone().with_session(self.session_id, self.state));
		debug!(session_id = %self.session_id, state = %self.state, "session renewed");
	}

	/// Writes the record for the superseded session, if it was kept.
	fn emit_completed(&mut self, now: Duration, ctx: &RumContext, sink: &dyn RecordSink) {
		if self.session_id.is_nil() || !self.kept {
			return;
		}
		let record = SessionRecord {
			id: self.session_id,
			state: self.state,
			timestamp: self.started_wall,
			duration_ns: now.saturating_sub(self.started_at).as_nanos() as u64,
		};
		let context = ctx.clone().with_session(self.session_id, self.state);
		sink.write(RumRecord::Session(record), &context);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::RumConfig;
	use crate::sample::FixedSampler;
	use crate::scope::testing::{harness, harness_with, Harness};
	use trellis_rum_core::{ActionKind, Attributes};

	fn create_test_session(h: &Harness) -> SessionScope {
		create_test_session_with(h, Box::new(FixedSampler::new(0.0)))
	}

	fn create_test_session_with(h: &Harness, sampler: Box<dyn Sampler>) -> SessionScope {
		SessionScope::new(h.services.clone(), sampler)
	}

	fn test_ctx() -> RumContext {
		RumContext::new("app-test")
	}

	fn start_view(h: &Harness) -> RawEvent {
		RawEvent::StartView {
			key: h.keys.issue(),
			name: "Home".to_string(),
			attributes: Attributes::new(),
		}
	}

	fn start_action() -> RawEvent {
		RawEvent::StartAction {
			kind: ActionKind::Tap,
			name: "tap".to_string(),
			wait_for_stop: false,
			attributes: Attributes::new(),
		}
	}

	#[test]
	fn test_first_event_creates_session() {
		let h = harness();
		let mut session = create_test_session(&h);
		let mut feedback = Vec::new();

		assert!(session.session_id.is_nil());
		session.handle_event(&RawEvent::KeepAlive, &test_ctx(), &h.sink, &mut feedback);

		assert!(!session.session_id.is_nil());
		assert_eq!(session.state, SessionState::Tracked);
	}

	#[test]
	fn test_interactions_within_window_share_one_session() {
		let h = harness();
		let mut session = create_test_session(&h);
		let mut feedback = Vec::new();
		let ctx = test_ctx();

		session.handle_event(&start_view(&h), &ctx, &h.sink, &mut feedback);
		let first = session.session_id;
		for _ in 0..10 {
			h.clock.advance(Duration::from_secs(60));
			session.handle_event(&start_action(), &ctx, &h.sink, &mut feedback);
		}

		assert_eq!(session.session_id, first);
	}

	#[test]
	fn test_interaction_after_inactivity_renews() {
		let h = harness();
		let mut session = create_test_session(&h);
		let mut feedback = Vec::new();
		let ctx = test_ctx();

		session.handle_event(&start_view(&h), &ctx, &h.sink, &mut feedback);
		let first = session.session_id;

		h.clock.advance(Duration::from_secs(15 * 60));
		session.handle_event(&start_action(), &ctx, &h.sink, &mut feedback);

		assert_ne!(session.session_id, first);
		assert_eq!(session.state, SessionState::Tracked);
	}

	#[test]
	fn test_non_interaction_after_inactivity_expires() {
		let h = harness();
		let mut session = create_test_session(&h);
		let mut feedback = Vec::new();
		let ctx = test_ctx();

		session.handle_event(&start_view(&h), &ctx, &h.sink, &mut feedback);
		let first = session.session_id;

		h.clock.advance(Duration::from_secs(16 * 60));
		session.handle_event(&RawEvent::KeepAlive, &ctx, &h.sink, &mut feedback);

		assert_eq!(session.session_id, first);
		assert_eq!(session.state, SessionState::Expired);
	}

	#[test]
	fn test_expired_session_renews_on_next_interaction() {
		let h = harness();
		let mut session = create_test_session(&h);
		let mut feedback = Vec::new();
		let ctx = test_ctx();

		session.handle_event(&start_view(&h), &ctx, &h.sink, &mut feedback);
		h.clock.advance(Duration::from_secs(16 * 60));
		session.handle_event(&RawEvent::KeepAlive, &ctx, &h.sink, &mut feedback);
		assert_eq!(session.state, SessionState::Expired);

		session.handle_event(&start_action(), &ctx, &h.sink, &mut feedback);
		assert_eq!(session.state, SessionState::Tracked);
	}

	#[test]
	fn test_background_event_renews_expired_session_when_enabled() {
		let mut config = RumConfig::default();
		config.track_background_events = true;
		let h = harness_with(config);
		let mut session = create_test_session(&h);
		let mut feedback = Vec::new();
		let ctx = test_ctx();

		session.handle_event(&start_view(&h), &ctx, &h.sink, &mut feedback);
		let first = session.session_id;

		h.clock.advance(Duration::from_secs(16 * 60));
		let error = RawEvent::AddError {
			message: "background failure".to_string(),
			origin: trellis_rum_core::ErrorOrigin::Source,
			error_kind: None,
			is_fatal: false,
			attributes: Attributes::new(),
		};
		session.handle_event(&error, &ctx, &h.sink, &mut feedback);

		assert_ne!(session.session_id, first);
		assert_ne!(session.state, SessionState::Expired);
	}

	#[test]
	fn test_max_duration_renews_even_with_steady_interaction() {
		let h = harness();
		let mut session = create_test_session(&h);
		let mut feedback = Vec::new();
		let ctx = test_ctx();

		session.handle_event(&start_view(&h), &ctx, &h.sink, &mut feedback);
		let first = session.session_id;

		// Interact every 10 minutes; after 4 hours the id must rotate anyway.
		let mut renewed = false;
		for _ in 0..25 {
			h.clock.advance(Duration::from_secs(10 * 60));
			session.handle_event(&start_action(), &ctx, &h.sink, &mut feedback);
			if session.session_id != first {
				renewed = true;
				break;
			}
		}
		assert!(renewed);
	}

	#[test]
	fn test_reset_session_renews_immediately() {
		let h = harness();
		let mut session = create_test_session(&h);
		let mut feedback = Vec::new();
		let ctx = test_ctx();

		session.handle_event(&start_view(&h), &ctx, &h.sink, &mut feedback);
		let first = session.session_id;
		session.handle_event(&RawEvent::ResetSession, &ctx, &h.sink, &mut feedback);

		assert_ne!(session.session_id, first);
	}

	#[test]
	fn test_unsampled_session_gates_children_output() {
		let h = harness();
		// Draw 100 is never below any rate.
		let mut session = create_test_session_with(&h, Box::new(FixedSampler::new(100.0)));
		let mut feedback = Vec::new();
		let ctx = test_ctx();

		session.handle_event(&start_view(&h), &ctx, &h.sink, &mut feedback);
		assert_eq!(session.state, SessionState::NotTracked);

		// A tap with an observable effect would normally emit an action.
		session.handle_event(&start_action(), &ctx, &h.sink, &mut feedback);
		session.handle_event(&RawEvent::ViewTreeChanged, &ctx, &h.sink, &mut feedback);
		h.clock.advance(Duration::from_millis(150));
		session.handle_event(&RawEvent::KeepAlive, &ctx, &h.sink, &mut feedback);
		for event in feedback.drain(..).collect::<Vec<_>>() {
			session.handle_event(&event, &ctx, &h.sink, &mut feedback);
		}

		assert!(h.sink.is_empty());
	}

	#[test]
	fn test_renewal_publishes_current_session() {
		let h = harness();
		let mut session = create_test_session(&h);
		let mut feedback = Vec::new();

		session.handle_event(&start_view(&h), &test_ctx(), &h.sink, &mut feedback);

		let published = h.services.current_session.current();
		assert_eq!(published.session_id, session.session_id);
		assert_eq!(published.session_state, SessionState::Tracked);
	}

	#[test]
	fn test_superseded_kept_session_emits_record_once() {
		let h = harness();
		let mut session = create_test_session(&h);
		let mut feedback = Vec::new();
		let ctx = test_ctx();

		session.handle_event(&start_view(&h), &ctx, &h.sink, &mut feedback);
		let first = session.session_id;

		h.clock.advance(Duration::from_secs(20 * 60));
		session.handle_event(&start_action(), &ctx, &h.sink, &mut feedback);

		let sessions: Vec<SessionRecord> = h
			.sink
			.records()
			.into_iter()
			.filter_map(|(r, _)| match r {
				RumRecord::Session(s) => Some(s),
				_ => None,
			})
			.collect();
		assert_eq!(sessions.len(), 1);
		assert_eq!(sessions[0].id, first);
		assert_eq!(
			sessions[0].duration_ns,
			Duration::from_secs(20 * 60).as_nanos() as u64
		);
	}

	#[test]
	fn test_superseded_unsampled_session_emits_nothing() {
		let h = harness();
		let mut session = create_test_session_with(&h, Box::new(FixedSampler::new(100.0)));
		let mut feedback = Vec::new();
		let ctx = test_ctx();

		session.handle_event(&start_view(&h), &ctx, &h.sink, &mut feedback);
		session.handle_event(&RawEvent::ResetSession, &ctx, &h.sink, &mut feedback);

		let sessions = h
			.sink
			.records()
			.iter()
			.filter(|(r, _)| matches!(r, RumRecord::Session(_)))
			.count();
		assert_eq!(sessions, 0);
	}

	#[test]
	fn test_sampling_distribution_converges() {
		let h = harness();
		let mut config = RumConfig::default();
		config.sample_rate = 25.0;
		let services = Arc::new(Services {
			config,
			clock: h.services.clock.clone(),
			keys: h.services.keys.clone(),
			process: h.services.process.clone(),
			current_session: h.services.current_session.clone(),
		});
		let mut session = SessionScope::new(
			services,
			Box::new(crate::sample::UniformSampler::with_seed(1234)),
		);
		let mut feedback = Vec::new();
		let ctx = test_ctx();

		let renewals = 2000;
		let mut tracked = 0u32;
		for _ in 0..renewals {
			session.handle_event(&RawEvent::ResetSession, &ctx, &h.sink, &mut feedback);
			if session.state == SessionState::Tracked {
				tracked += 1;
			}
		}

		let fraction = f64::from(tracked) / f64::from(renewals);
		assert!(
			(fraction - 0.25).abs() < 0.05,
			"tracked fraction {fraction} too far from 0.25"
		);
	}
}
