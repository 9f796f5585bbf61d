// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scope routing events to live views and synthesizing implicit ones.

use std::sync::Arc;

use tracing::{debug, warn};
use trellis_rum_core::{Attributes, RawEvent, RumContext, ScopeKey};

use super::view::ViewScope;
use super::{
	is_app_launch_event, is_background_event, is_silent_orphan_event, ScopeOutcome, Services,
};
use crate::sink::RecordSink;

/// Name of the implicit view synthesized before the first real view.
const APP_LAUNCH_VIEW_NAME: &str = "ApplicationLaunch";
/// Name of the implicit view synthesized for background events.
const BACKGROUND_VIEW_NAME: &str = "Background";

const MESSAGE_MISSING_VIEW: &str =
	"an event was received but no view is active; it will not be tracked";

/// Routes events to a rolling window of views.
///
/// A stopped-but-unfinished view and a freshly started one may coexist, so
/// children live in a list rather than a single slot. When no child is
/// active the router applies the orphan policy: synthesize an implicit
/// app-launch or background view, warn, or stay silent, exactly one of the
/// four per event.
pub(crate) struct ViewRouterScope {
	svc: Arc<Services>,
	views: Vec<ViewScope>,
}

impl ViewRouterScope {
	pub(crate) fn new(svc: Arc<Services>) -> Self {
		Self {
			svc,
			views: Vec::new(),
		}
	}

	pub(crate) fn handle_event(
		&mut self,
		event: &RawEvent,
		ctx: &RumContext,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) -> ScopeOutcome {
		let mut any_active = false;
		self.views.retain_mut(|view| {
			match view.handle_event(event, ctx, sink, feedback) {
				ScopeOutcome::Continue => {
					if view.is_active() {
						any_active = true;
					}
					true
				}
				ScopeOutcome::Finished => {
					debug!(view = view.name(), "view finished, detaching");
					false
				}
			}
		});

		match event {
			RawEvent::StartView {
				key,
				name,
				attributes,
			} => self.start_view(*key, name, attributes, feedback),
			_ if !any_active => self.handle_orphan(event, ctx, sink, feedback),
			_ => {}
		}

		// The router lives as long as its session.
		ScopeOutcome::Continue
	}

	fn start_view(
		&mut self,
		key: ScopeKey,
		name: &str,
		attributes: &Attributes,
		feedback: &mut Vec<RawEvent>,
	) {
		let view = ViewScope::new(
			self.svc.clone(),
			Some(key),
			name.to_string(),
			attributes.clone(),
		);
		if !self.svc.process.first_view_shown() {
			self.svc.process.mark_first_view_shown();
			// The first view carries the measured process-startup latency.
			feedback.push(RawEvent::ApplicationStarted {
				startup_duration: self.svc.process.startup_duration(),
			});
		}
		self.views.push(view);
	}

	fn handle_orphan(
		&mut self,
		event: &RawEvent,
		ctx: &RumContext,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) {
		let launching =
			self.svc.process.is_foreground() && !self.svc.process.first_view_shown();
		if launching {
			if is_app_launch_event(event) {
				debug!(event = event.name(), "synthesizing app-launch view");
				self.synthesize_view(APP_LAUNCH_VIEW_NAME, event, ctx, sink, feedback);
			} else if !is_silent_orphan_event(event) {
				warn!(event = event.name(), "{}", MESSAGE_MISSING_VIEW);
			}
		} else if self.svc.config.track_background_events && is_background_event(event) {
			debug!(event = event.name(), "synthesizing background view");
			self.synthesize_view(BACKGROUND_VIEW_NAME, event, ctx, sink, feedback);
		} else if !is_silent_orphan_event(event) {
			warn!(event = event.name(), "{}", MESSAGE_MISSING_VIEW);
		}
	}

	fn synthesize_view(
		&mut self,
		name: &str,
		event: &RawEvent,
		ctx: &RumContext,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) {
		let mut view = ViewScope::new(self.svc.clone(), None, name.to_string(), Attributes::new());
		let _ = view.handle_event(event, ctx, sink, feedback);
		self.views.push(view);
	}
}
