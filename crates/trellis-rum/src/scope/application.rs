// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Root scope anchoring the application identity.

use std::sync::Arc;

use trellis_rum_core::{RawEvent, RumContext};

use super::session::SessionScope;
use super::{ScopeOutcome, Services};
use crate::sample::Sampler;
use crate::sink::RecordSink;

/// Root of the tree: a static identity anchor.
///
/// Forwards every event to its single session scope unconditionally and
/// never finishes.
pub(crate) struct ApplicationScope {
	context: RumContext,
	session: SessionScope,
}

impl ApplicationScope {
	pub(crate) fn new(
		svc: Arc<Services>,
		application_id: impl Into<String>,
		sampler: Box<dyn Sampler>,
	) -> Self {
		Self {
			context: RumContext::new(application_id),
			session: SessionScope::new(svc, sampler),
		}
	}

	pub(crate) fn handle_event(
		&mut self,
		event: &RawEvent,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) -> ScopeOutcome {
		let _ = self.session.handle_event(event, &self.context, sink, feedback);
		ScopeOutcome::Continue
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sample::FixedSampler;
	use crate::scope::testing::harness;
	use trellis_rum_core::RumRecord;

	#[test]
	fn test_root_forwards_and_never_finishes() {
		let h = harness();
		let mut root = ApplicationScope::new(
			h.services.clone(),
			"app-under-test",
			Box::new(FixedSampler::new(0.0)),
		);
		let mut feedback = Vec::new();

		let outcome = root.handle_event(&RawEvent::KeepAlive, &h.sink, &mut feedback);
		assert_eq!(outcome, ScopeOutcome::Continue);

		// The forwarded event reached the session scope and created one.
		let published = h.services.current_session.current();
		assert!(!published.session_id.is_nil());
	}

	#[test]
	fn test_records_carry_application_id() {
		let h = harness();
		let mut root = ApplicationScope::new(
			h.services.clone(),
			"app-under-test",
			Box::new(FixedSampler::new(0.0)),
		);
		let mut feedback = Vec::new();

		let key = h.keys.issue();
		root.handle_event(
			&RawEvent::StartView {
				key,
				name: "Home".to_string(),
				attributes: trellis_rum_core::Attributes::new(),
			},
			&h.sink,
			&mut feedback,
		);
		root.handle_event(
			&RawEvent::StopView {
				key,
				attributes: trellis_rum_core::Attributes::new(),
			},
			&h.sink,
			&mut feedback,
		);

		let records = h.sink.records();
		assert!(!records.is_empty());
		assert!(records
			.iter()
			.filter(|(r, _)| matches!(r, RumRecord::View(_)))
			.all(|(_, ctx)| ctx.application_id == "app-under-test"));
	}
}
