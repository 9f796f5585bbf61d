// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session identity for the monitoring tree.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a session.
///
/// The nil id marks "no session yet"; the session node replaces it with a
/// random id on the first event it sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SessionId(pub Uuid);

impl SessionId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}

	/// The "no session yet" sentinel.
	#[must_use]
	pub fn nil() -> Self {
		Self(Uuid::nil())
	}

	#[must_use]
	pub fn is_nil(&self) -> bool {
		self.0.is_nil()
	}

	#[must_use]
	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl Default for SessionId {
	fn default() -> Self {
		Self::nil()
	}
}

impl std::fmt::Display for SessionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for SessionId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Tracking state of a session.
///
/// Decided by a sampling draw at every renewal; `Expired` marks a session
/// that outlived its inactivity window without being renewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
	/// Session lost the sampling draw; records are computed but not emitted
	NotTracked,
	/// Session won the sampling draw; records are emitted
	Tracked,
	/// Session exceeded its inactivity window and was not renewed
	Expired,
}

impl std::fmt::Display for SessionState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SessionState::NotTracked => write!(f, "not_tracked"),
			SessionState::Tracked => write!(f, "tracked"),
			SessionState::Expired => write!(f, "expired"),
		}
	}
}

impl std::str::FromStr for SessionState {
	type Err = crate::error::RumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"not_tracked" => Ok(SessionState::NotTracked),
			"tracked" => Ok(SessionState::Tracked),
			"expired" => Ok(SessionState::Expired),
			_ => Err(crate::error::RumError::InvalidSessionState(s.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn session_id_roundtrip(uuid_bytes in any::<[u8; 16]>()) {
			let uuid = Uuid::from_bytes(uuid_bytes);
			let id = SessionId(uuid);
			let s = id.to_string();
			let parsed: SessionId = s.parse().unwrap();
			prop_assert_eq!(id, parsed);
		}

		#[test]
		fn session_state_roundtrip(state in prop_oneof![
			Just(SessionState::NotTracked),
			Just(SessionState::Tracked),
			Just(SessionState::Expired),
		]) {
			let s = state.to_string();
			let parsed: SessionState = s.parse().unwrap();
			prop_assert_eq!(state, parsed);
		}
	}

	#[test]
	fn test_new_session_id_is_not_nil() {
		let id = SessionId::new();
		assert!(!id.is_nil());
	}

	#[test]
	fn test_default_session_id_is_nil() {
		assert!(SessionId::default().is_nil());
	}

	#[test]
	fn test_session_state_display() {
		assert_eq!(SessionState::Tracked.to_string(), "tracked");
		assert_eq!(SessionState::NotTracked.to_string(), "not_tracked");
		assert_eq!(SessionState::Expired.to_string(), "expired");
	}

	#[test]
	fn test_session_state_parse_rejects_unknown() {
		assert!("sampled".parse::<SessionState>().is_err());
	}
}
