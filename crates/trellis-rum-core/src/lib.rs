// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Trellis real user monitoring pipeline.
//!
//! This crate holds the wire-ready data model shared between the event
//! aggregation tree and its collaborators: raw instrumentation events,
//! aggregated output records, the identifier context attached to every
//! record, session identity, and the opaque key handles used to track
//! externally-owned objects without owning them.

pub mod context;
pub mod error;
pub mod event;
pub mod key;
pub mod record;
pub mod session;

pub use context::RumContext;
pub use error::RumError;
pub use event::{Attributes, RawEvent};
pub use key::{AlwaysAlive, KeyArena, KeyLiveness, ScopeKey};
pub use record::{
	ActionId, ActionKind, ActionRecord, ErrorOrigin, ErrorRecord, ErrorResource, HttpMethod,
	ResourceId, ResourceKind, ResourceRecord, RumRecord, SessionRecord, TelemetryKind,
	TelemetryRecord, ViewId, ViewRecord,
};
pub use session::{SessionId, SessionState};
