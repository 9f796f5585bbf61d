// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Public entry point and single serialization point for raw events.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;
use trellis_rum_core::{
	ActionKind, AlwaysAlive, Attributes, ErrorOrigin, HttpMethod, KeyLiveness, RawEvent,
	ResourceKind, RumError, ScopeKey, TelemetryKind,
};

use crate::clock::{Clock, SystemClock};
use crate::config::RumConfig;
use crate::observer::CurrentSession;
use crate::process::{HostProcess, ProcessContext};
use crate::sample::{Sampler, UniformSampler};
use crate::scope::application::ApplicationScope;
use crate::scope::Services;
use crate::sink::RecordSink;
use crate::telemetry::TelemetryGate;

/// Builder for constructing a [`RumMonitor`].
pub struct RumMonitorBuilder {
	application_id: Option<String>,
	sink: Option<Arc<dyn RecordSink>>,
	config: RumConfig,
	clock: Option<Arc<dyn Clock>>,
	keys: Option<Arc<dyn KeyLiveness>>,
	process: Option<Arc<dyn ProcessContext>>,
	sampler: Option<Box<dyn Sampler>>,
	telemetry_sampler: Option<Box<dyn Sampler>>,
}

impl RumMonitorBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			application_id: None,
			sink: None,
			config: RumConfig::default(),
			clock: None,
			keys: None,
			process: None,
			sampler: None,
			telemetry_sampler: None,
		}
	}

	/// Sets the application identifier carried by every record.
	pub fn application_id(mut self, id: impl Into<String>) -> Self {
		self.application_id = Some(id.into());
		self
	}

	/// Sets the downstream record sink.
	pub fn sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
		self.sink = Some(sink);
		self
	}

	/// Replaces the default configuration.
	pub fn config(mut self, config: RumConfig) -> Self {
		self.config = config;
		self
	}

	/// Injects a time source; defaults to [`SystemClock`].
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);
		self
	}

	/// Injects the key liveness query supplied by the raw-event source;
	/// defaults to treating every key as alive.
	pub fn key_liveness(mut self, keys: Arc<dyn KeyLiveness>) -> Self {
		self.keys = Some(keys);
		self
	}

	/// Injects the host process state; defaults to a foregrounded
	/// [`HostProcess`].
	pub fn process(mut self, process: Arc<dyn ProcessContext>) -> Self {
		self.process = Some(process);
		self
	}

	/// Injects the session sampling source; defaults to [`UniformSampler`].
	pub fn sampler(mut self, sampler: Box<dyn Sampler>) -> Self {
		self.sampler = Some(sampler);
		self
	}

	/// Injects the telemetry sampling source; defaults to [`UniformSampler`].
	pub fn telemetry_sampler(mut self, sampler: Box<dyn Sampler>) -> Self {
		self.telemetry_sampler = Some(sampler);
		self
	}

	/// Builds the monitor, validating the configuration.
	pub fn build(self) -> Result<RumMonitor, RumError> {
		let application_id = self
			.application_id
			.ok_or(RumError::MissingField("application_id"))?;
		let sink = self.sink.ok_or(RumError::MissingField("sink"))?;
		self.config.validate()?;

		let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
		let keys = self.keys.unwrap_or_else(|| Arc::new(AlwaysAlive));
		let process = self
			.process
			.unwrap_or_else(|| Arc::new(HostProcess::new(true)));
		let sampler = self
			.sampler
			.unwrap_or_else(|| Box::new(UniformSampler::new()));
		let telemetry_sampler = self
			.telemetry_sampler
			.unwrap_or_else(|| Box::new(UniformSampler::new()));

		let current_session = Arc::new(CurrentSession::new(application_id.clone()));
		let services = Arc::new(Services {
			config: self.config.clone(),
			clock: clock.clone(),
			keys,
			process,
			current_session: current_session.clone(),
		});

		let root = ApplicationScope::new(services, application_id.clone(), sampler);
		let telemetry = TelemetryGate::new(self.config, clock, telemetry_sampler);

		info!(application_id = %application_id, "RUM monitor initialized");

		Ok(RumMonitor {
			core: Mutex::new(MonitorCore { root, telemetry }),
			current_session,
			sink,
		})
	}
}

impl Default for RumMonitorBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct MonitorCore {
	root: ApplicationScope,
	telemetry: TelemetryGate,
}

/// The aggregation tree behind its single serialization point.
///
/// Instrumentation hooks on arbitrary threads hand events off here; the
/// internal mutex guarantees one event is processed to completion through
/// the whole tree depth (including the follow-up events it generates) before
/// the next one enters. Nothing inside blocks or defers: emission happens
/// synchronously within the same turn.
pub struct RumMonitor {
	core: Mutex<MonitorCore>,
	current_session: Arc<CurrentSession>,
	sink: Arc<dyn RecordSink>,
}

impl RumMonitor {
	/// Creates a new builder for constructing a monitor.
	pub fn builder() -> RumMonitorBuilder {
		RumMonitorBuilder::new()
	}

	/// Read handle for the process-wide current session context.
	pub fn current_session(&self) -> Arc<CurrentSession> {
		self.current_session.clone()
	}

	/// Feeds one raw event through the tree.
	///
	/// Diagnostic telemetry is routed to the dedup/cap gate instead of the
	/// tree; everything else enters at the application scope. Follow-up
	/// events produced while processing are drained within the same turn.
	pub fn handle_event(&self, event: RawEvent) {
		let mut core = self.core.lock().expect("monitor poisoned");
		let mut queue = VecDeque::new();
		queue.push_back(event);

		while let Some(event) = queue.pop_front() {
			if let RawEvent::SendTelemetry {
				kind,
				message,
				extra_kind,
				is_metric,
			} = &event
			{
				core.telemetry.handle_event(
					*kind,
					message,
					extra_kind.clone(),
					*is_metric,
					&self.current_session.current(),
					self.sink.as_ref(),
				);
				continue;
			}

			let mut feedback = Vec::new();
			let _ = core.root.handle_event(&event, self.sink.as_ref(), &mut feedback);
			queue.extend(feedback);
		}
	}

	/// Notifies the tree that a view came on screen.
	pub fn start_view(&self, key: ScopeKey, name: impl Into<String>, attributes: Attributes) {
		self.handle_event(RawEvent::StartView {
			key,
			name: name.into(),
			attributes,
		});
	}

	/// Notifies the tree that a view left the screen.
	pub fn stop_view(&self, key: ScopeKey, attributes: Attributes) {
		self.handle_event(RawEvent::StopView { key, attributes });
	}

	/// Notifies the tree that a user interaction began.
	pub fn start_action(
		&self,
		kind: ActionKind,
		name: impl Into<String>,
		wait_for_stop: bool,
		attributes: Attributes,
	) {
		self.handle_event(RawEvent::StartAction {
			kind,
			name: name.into(),
			wait_for_stop,
			attributes,
		});
	}

	/// Stops the current action, updating its name and attributes.
	pub fn stop_action(&self, name: impl Into<String>, attributes: Attributes) {
		self.handle_event(RawEvent::StopAction {
			name: name.into(),
			attributes,
		});
	}

	/// Signals a host view-hierarchy mutation.
	pub fn view_tree_changed(&self) {
		self.handle_event(RawEvent::ViewTreeChanged);
	}

	/// Notifies the tree that a network call started.
	pub fn start_resource(
		&self,
		key: ScopeKey,
		url: impl Into<String>,
		method: HttpMethod,
		attributes: Attributes,
	) {
		self.handle_event(RawEvent::StartResource {
			key,
			url: url.into(),
			method,
			attributes,
		});
	}

	/// Notifies the tree that a network call completed.
	pub fn stop_resource(
		&self,
		key: ScopeKey,
		kind: ResourceKind,
		status_code: Option<u16>,
		size_bytes: Option<u64>,
		attributes: Attributes,
	) {
		self.handle_event(RawEvent::StopResource {
			key,
			kind,
			status_code,
			size_bytes,
			attributes,
		});
	}

	/// Notifies the tree that a network call failed.
	pub fn stop_resource_with_error(
		&self,
		key: ScopeKey,
		message: impl Into<String>,
		origin: ErrorOrigin,
		error_kind: Option<String>,
	) {
		self.handle_event(RawEvent::StopResourceWithError {
			key,
			message: message.into(),
			origin,
			error_kind,
		});
	}

	/// Records an application error against the active view.
	pub fn add_error(
		&self,
		message: impl Into<String>,
		origin: ErrorOrigin,
		error_kind: Option<String>,
		is_fatal: bool,
		attributes: Attributes,
	) {
		self.handle_event(RawEvent::AddError {
			message: message.into(),
			origin,
			error_kind,
			is_fatal,
			attributes,
		});
	}

	/// Reports the measured process startup latency.
	pub fn application_started(&self, startup_duration: Duration) {
		self.handle_event(RawEvent::ApplicationStarted { startup_duration });
	}

	/// Explicitly renews the session.
	pub fn reset_session(&self) {
		self.handle_event(RawEvent::ResetSession);
	}

	/// Periodic tick keeping long-lived view snapshots fresh.
	pub fn keep_alive(&self) {
		self.handle_event(RawEvent::KeepAlive);
	}

	/// Submits an internal diagnostic telemetry event.
	pub fn send_telemetry(
		&self,
		kind: TelemetryKind,
		message: impl Into<String>,
		extra_kind: Option<String>,
		is_metric: bool,
	) {
		self.handle_event(RawEvent::SendTelemetry {
			kind,
			message: message.into(),
			extra_kind,
			is_metric,
		});
	}
}
