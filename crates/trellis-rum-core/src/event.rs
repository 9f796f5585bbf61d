// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Raw instrumentation events consumed by the aggregation tree.

use std::collections::HashMap;
use std::time::Duration;

use crate::key::ScopeKey;
use crate::record::{
	ActionKind, ErrorOrigin, HttpMethod, ResourceId, ResourceKind, TelemetryKind, ViewId,
};

/// Free-form attributes attached by the instrumentation hooks.
pub type Attributes = HashMap<String, serde_json::Value>;

/// One raw event entering the tree at the application node.
///
/// Immutable once constructed. The `Sent*`/`Dropped*` variants are produced
/// by the tree itself when a leaf completes, and re-enter at the root so the
/// owning view can settle its bookkeeping before the next external event.
#[derive(Debug, Clone)]
pub enum RawEvent {
	/// A view came on screen
	StartView {
		key: ScopeKey,
		name: String,
		attributes: Attributes,
	},
	/// A view left the screen
	StopView { key: ScopeKey, attributes: Attributes },
	/// A user interaction began
	StartAction {
		kind: ActionKind,
		name: String,
		/// Hold the action open until an explicit stop arrives
		wait_for_stop: bool,
		attributes: Attributes,
	},
	/// The current action ended; updates its name and attributes
	StopAction { name: String, attributes: Attributes },
	/// The host view hierarchy mutated (keeps the current action alive)
	ViewTreeChanged,
	/// A network call started
	StartResource {
		key: ScopeKey,
		url: String,
		method: HttpMethod,
		attributes: Attributes,
	},
	/// A network call completed
	StopResource {
		key: ScopeKey,
		kind: ResourceKind,
		status_code: Option<u16>,
		size_bytes: Option<u64>,
		attributes: Attributes,
	},
	/// A network call failed
	StopResourceWithError {
		key: ScopeKey,
		message: String,
		origin: ErrorOrigin,
		error_kind: Option<String>,
	},
	/// An error occurred in the host application
	AddError {
		message: String,
		origin: ErrorOrigin,
		error_kind: Option<String>,
		is_fatal: bool,
		attributes: Attributes,
	},
	/// The process finished starting up
	ApplicationStarted { startup_duration: Duration },
	/// Explicit request to renew the session
	ResetSession,
	/// Periodic tick to refresh long-lived view snapshots
	KeepAlive,
	/// Internal diagnostic event for the dedup/cap subsystem
	SendTelemetry {
		kind: TelemetryKind,
		message: String,
		extra_kind: Option<String>,
		is_metric: bool,
	},
	/// A resource under `view_id` wrote its record
	SentResource { view_id: ViewId },
	/// The action under `view_id` wrote its record
	SentAction { view_id: ViewId },
	/// An error under `view_id` was written; `resource_id` is set when the
	/// error terminated a resource call
	SentError {
		view_id: ViewId,
		resource_id: Option<ResourceId>,
	},
	/// A resource under `view_id` closed without emitting
	DroppedResource { view_id: ViewId },
	/// The action under `view_id` closed without emitting
	DroppedAction { view_id: ViewId },
}

impl RawEvent {
	/// Static kind label for diagnostics.
	#[must_use]
	pub fn name(&self) -> &'static str {
		match self {
			Self::StartView { .. } => "start_view",
			Self::StopView { .. } => "stop_view",
			Self::StartAction { .. } => "start_action",
			Self::StopAction { .. } => "stop_action",
			Self::ViewTreeChanged => "view_tree_changed",
			Self::StartResource { .. } => "start_resource",
			Self::StopResource { .. } => "stop_resource",
			Self::StopResourceWithError { .. } => "stop_resource_with_error",
			Self::AddError { .. } => "add_error",
			Self::ApplicationStarted { .. } => "application_started",
			Self::ResetSession => "reset_session",
			Self::KeepAlive => "keep_alive",
			Self::SendTelemetry { .. } => "send_telemetry",
			Self::SentResource { .. } => "sent_resource",
			Self::SentAction { .. } => "sent_action",
			Self::SentError { .. } => "sent_error",
			Self::DroppedResource { .. } => "dropped_resource",
			Self::DroppedAction { .. } => "dropped_action",
		}
	}

	/// True for events that count as direct user interaction.
	#[must_use]
	pub fn is_interaction(&self) -> bool {
		matches!(self, Self::StartView { .. } | Self::StartAction { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_interaction_events() {
		let start_view = RawEvent::StartView {
			key: crate::key::KeyArena::new().issue(),
			name: "Home".to_string(),
			attributes: Attributes::new(),
		};
		assert!(start_view.is_interaction());
		assert!(RawEvent::StartAction {
			kind: ActionKind::Tap,
			name: "submit".to_string(),
			wait_for_stop: false,
			attributes: Attributes::new(),
		}
		.is_interaction());
		assert!(!RawEvent::KeepAlive.is_interaction());
		assert!(!RawEvent::ViewTreeChanged.is_interaction());
	}

	#[test]
	fn test_event_names_are_stable() {
		assert_eq!(RawEvent::KeepAlive.name(), "keep_alive");
		assert_eq!(RawEvent::ResetSession.name(), "reset_session");
		assert_eq!(
			RawEvent::SentError {
				view_id: ViewId::new(),
				resource_id: None,
			}
			.name(),
			"sent_error"
		);
	}
}
