// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identifier context attached to every emitted record.

use serde::{Deserialize, Serialize};

use crate::record::{ActionId, ViewId};
use crate::session::{SessionId, SessionState};

/// Immutable identifier chain for one emission.
///
/// Each tree level overlays its own identifiers on its parent's context;
/// a record carries the context of the node that emitted it, captured at
/// emission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RumContext {
	pub application_id: String,
	pub session_id: SessionId,
	pub session_state: SessionState,
	pub view_id: Option<ViewId>,
	pub view_name: Option<String>,
	pub action_id: Option<ActionId>,
}

impl RumContext {
	/// Root context as supplied by the application node.
	#[must_use]
	pub fn new(application_id: impl Into<String>) -> Self {
		Self {
			application_id: application_id.into(),
			session_id: SessionId::nil(),
			session_state: SessionState::NotTracked,
			view_id: None,
			view_name: None,
			action_id: None,
		}
	}

	/// Overlays session identity onto this context.
	#[must_use]
	pub fn with_session(mut self, session_id: SessionId, state: SessionState) -> Self {
		self.session_id = session_id;
		self.session_state = state;
		self
	}

	/// Overlays view identity onto this context.
	#[must_use]
	pub fn with_view(mut self, view_id: ViewId, view_name: impl Into<String>) -> Self {
		self.view_id = Some(view_id);
		self.view_name = Some(view_name.into());
		self
	}

	/// Overlays the current action onto this context.
	#[must_use]
	pub fn with_action(mut self, action_id: Option<ActionId>) -> Self {
		self.action_id = action_id;
		self
	}
}

impl Default for RumContext {
	fn default() -> Self {
		Self::new(String::new())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_overlay_preserves_parent_fields() {
		let session = SessionId::new();
		let view = ViewId::new();
		let ctx = RumContext::new("app-1")
			.with_session(session, SessionState::Tracked)
			.with_view(view, "Checkout");

		assert_eq!(ctx.application_id, "app-1");
		assert_eq!(ctx.session_id, session);
		assert_eq!(ctx.session_state, SessionState::Tracked);
		assert_eq!(ctx.view_id, Some(view));
		assert_eq!(ctx.view_name.as_deref(), Some("Checkout"));
		assert_eq!(ctx.action_id, None);
	}

	#[test]
	fn test_root_context_has_nil_session() {
		let ctx = RumContext::new("app-1");
		assert!(ctx.session_id.is_nil());
		assert_eq!(ctx.session_state, SessionState::NotTracked);
	}

	#[test]
	fn test_with_action_can_clear() {
		let ctx = RumContext::new("app-1").with_action(Some(ActionId::new()));
		assert!(ctx.action_id.is_some());
		let ctx = ctx.with_action(None);
		assert!(ctx.action_id.is_none());
	}
}
