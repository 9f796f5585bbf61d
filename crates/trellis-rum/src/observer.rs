// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process-wide publication of the current session context.

use std::sync::RwLock;

use trellis_rum_core::RumContext;

/// Read handle for the active session context.
///
/// The session node publishes here atomically with every renewal; external
/// collaborators (log enrichment, crash reporting) read it from any thread.
/// Only the tree writes. Owned by the monitor and torn down with it rather
/// than living as ambient global state.
#[derive(Debug)]
pub struct CurrentSession {
	inner: RwLock<RumContext>,
}

impl CurrentSession {
	#[must_use]
	pub fn new(application_id: impl Into<String>) -> Self {
		Self {
			inner: RwLock::new(RumContext::new(application_id)),
		}
	}

	/// The context of the most recently renewed session.
	#[must_use]
	pub fn current(&self) -> RumContext {
		self.inner.read().expect("current session poisoned").clone()
	}

	pub(crate) fn publish(&self, context: RumContext) {
		*self.inner.write().expect("current session poisoned") = context;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use trellis_rum_core::{SessionId, SessionState};

	#[test]
	fn test_starts_with_nil_session() {
		let current = CurrentSession::new("app-1");
		let ctx = current.current();
		assert_eq!(ctx.application_id, "app-1");
		assert!(ctx.session_id.is_nil());
	}

	#[test]
	fn test_publish_replaces_context() {
		let current = CurrentSession::new("app-1");
		let session = SessionId::new();
		current.publish(RumContext::new("app-1").with_session(session, SessionState::Tracked));

		let ctx = current.current();
		assert_eq!(ctx.session_id, session);
		assert_eq!(ctx.session_state, SessionState::Tracked);
	}
}
