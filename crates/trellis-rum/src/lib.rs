// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Real user monitoring SDK: the event aggregation scope tree.
//!
//! Consumes a serialized stream of raw application lifecycle events (view
//! started/stopped, actions, network calls, errors, keep-alive ticks,
//! session resets) and produces aggregated records, each emitted exactly
//! once to a downstream sink. Sessions are sampled and renewed on
//! inactivity; views snapshot themselves under a throttle; actions and
//! resources close on time windows or when their non-owning key handles are
//! reclaimed.
//!
//! The [`monitor::RumMonitor`] is the single entry point: instrumentation
//! hooks on any thread hand events off to it, and every external
//! collaborator (clock, sampling, sink, process state, key liveness) is an
//! injectable port.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_rum::monitor::RumMonitor;
//! use trellis_rum::sink::MemorySink;
//! use trellis_rum_core::{ActionKind, Attributes, KeyArena};
//!
//! let sink = Arc::new(MemorySink::new());
//! let keys = Arc::new(KeyArena::new());
//! let monitor = RumMonitor::builder()
//! 	.application_id("my-app")
//! 	.sink(sink.clone())
//! 	.key_liveness(keys.clone())
//! 	.build()
//! 	.unwrap();
//!
//! let view = keys.issue();
//! monitor.start_view(view, "Home", Attributes::new());
//! monitor.start_action(ActionKind::Tap, "submit", false, Attributes::new());
//! monitor.stop_view(view, Attributes::new());
//! assert!(!sink.is_empty());
//! ```

pub mod clock;
pub mod config;
pub mod monitor;
pub mod observer;
pub mod process;
pub mod sample;
mod scope;
pub mod sink;
mod telemetry;

pub use clock::{Clock, StepClock, SystemClock};
pub use config::RumConfig;
pub use monitor::{RumMonitor, RumMonitorBuilder};
pub use observer::CurrentSession;
pub use process::{HostProcess, ProcessContext};
pub use sample::{FixedSampler, Sampler, UniformSampler};
pub use sink::{MemorySink, NoopSink, RecordSink};

pub use trellis_rum_core::{
	ActionId, ActionKind, ActionRecord, AlwaysAlive, Attributes, ErrorOrigin, ErrorRecord,
	ErrorResource, HttpMethod, KeyArena, KeyLiveness, RawEvent, ResourceId, ResourceKind,
	ResourceRecord, RumContext, RumError, RumRecord, ScopeKey, SessionId, SessionRecord,
	SessionState, TelemetryKind, TelemetryRecord, ViewId, ViewRecord,
};
