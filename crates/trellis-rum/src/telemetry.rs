// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dedup and cap gate for internal diagnostic telemetry.
//!
//! A sibling consumer of the raw-event stream, filtered to `SendTelemetry`
//! events. Sampling is evaluated before any bookkeeping so it reduces load
//! prior to the identity and cap checks; the identity set, the emitted
//! counter, and the cap-warning latch all reset when the observed session id
//! changes.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};
use trellis_rum_core::{RumContext, RumRecord, SessionId, TelemetryKind, TelemetryRecord};

use crate::clock::Clock;
use crate::config::RumConfig;
use crate::sample::Sampler;
use crate::sink::RecordSink;

/// Per-session identity of a telemetry event.
type TelemetryIdentity = (TelemetryKind, String, Option<String>);

/// Bounds and deduplicates diagnostic telemetry per session.
pub(crate) struct TelemetryGate {
	config: RumConfig,
	clock: Arc<dyn Clock>,
	sampler: Box<dyn Sampler>,
	seen: HashSet<TelemetryIdentity>,
	sent: u64,
	session_id: SessionId,
	cap_warned: bool,
}

impl TelemetryGate {
	pub(crate) fn new(config: RumConfig, clock: Arc<dyn Clock>, sampler: Box<dyn Sampler>) -> Self {
		Self {
			config,
			clock,
			sampler,
			seen: HashSet::new(),
			sent: 0,
			session_id: SessionId::nil(),
			cap_warned: false,
		}
	}

	pub(crate) fn handle_event(
		&mut self,
		kind: TelemetryKind,
		message: &str,
		extra_kind: Option<String>,
		is_metric: bool,
		ctx: &RumContext,
		sink: &dyn RecordSink,
	) {
		if ctx.session_id != self.session_id {
			self.reset(ctx.session_id);
		}

		let rate = match kind {
			TelemetryKind::Configuration => self.config.telemetry_configuration_sample_rate,
			_ => self.config.telemetry_sample_rate,
		};
		if self.sampler.draw() >= rate {
			return;
		}

		let identity = (kind, message.to_string(), extra_kind.clone());
		if !is_metric && self.seen.contains(&identity) {
			debug!(kind = %kind, message = %message, "duplicate telemetry in session, dropping");
			return;
		}

		if self.sent >= self.config.telemetry_max_events_per_session {
			if !self.cap_warned {
				warn!(
					cap = self.config.telemetry_max_events_per_session,
					"telemetry cap reached for this session, dropping further events"
				);
				self.cap_warned = true;
			}
			return;
		}

		self.seen.insert(identity);
		self.sent += 1;

		let record = TelemetryRecord {
			kind,
			message: message.to_string(),
			extra_kind,
			is_metric,
			timestamp: self.clock.wall(),
		};
		sink.write(RumRecord::Telemetry(record), ctx);
	}

	fn reset(&mut self, session_id: SessionId) {
		self.seen.clear();
		self.sent = 0;
		self.cap_warned = false;
		self.session_id = session_id;
	}
}
