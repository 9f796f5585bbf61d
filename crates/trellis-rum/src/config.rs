// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the monitoring tree.

use std::time::Duration;

use trellis_rum_core::RumError;

/// Session inactivity window before a new interaction renews the session.
const SESSION_INACTIVITY: Duration = Duration::from_secs(15 * 60);
/// Hard ceiling on session age before unconditional renewal.
const SESSION_MAX_DURATION: Duration = Duration::from_secs(4 * 60 * 60);
/// Quiet period after which an action with no pending resources closes.
const ACTION_INACTIVITY: Duration = Duration::from_millis(100);
/// Hard ceiling on action duration, pending resources or not.
const ACTION_MAX_DURATION: Duration = Duration::from_secs(10);
/// Minimum interval between throttled view snapshots.
const VIEW_UPDATE_INTERVAL: Duration = Duration::from_secs(30);
/// Hard cap on telemetry events accepted per session.
const TELEMETRY_MAX_EVENTS_PER_SESSION: u64 = 100;
/// Default sampling rate for debug/error telemetry, percent.
const TELEMETRY_SAMPLE_RATE: f64 = 20.0;
/// Default sampling rate for configuration telemetry, percent.
const TELEMETRY_CONFIGURATION_SAMPLE_RATE: f64 = 20.0;

/// Tuning knobs for the aggregation tree.
///
/// Defaults carry the production reference values; every duration must be
/// non-zero and every rate within `[0, 100]` percent.
#[derive(Debug, Clone)]
pub struct RumConfig {
	/// Percentage of sessions kept by the per-renewal sampling draw.
	pub sample_rate: f64,
	/// Track events that arrive while the process is backgrounded.
	pub track_background_events: bool,
	/// Inactivity window after which an interaction renews the session.
	pub session_inactivity: Duration,
	/// Maximum session age before unconditional renewal.
	pub session_max_duration: Duration,
	/// Quiet period closing an action with an empty waiting set.
	pub action_inactivity: Duration,
	/// Maximum action duration, closing it even with pending resources.
	pub action_max_duration: Duration,
	/// Minimum interval between throttled view snapshots.
	pub view_update_interval: Duration,
	/// Sampling rate for debug/error telemetry events, percent.
	pub telemetry_sample_rate: f64,
	/// Sampling rate for configuration telemetry events, percent.
	pub telemetry_configuration_sample_rate: f64,
	/// Hard cap on telemetry events accepted per session.
	pub telemetry_max_events_per_session: u64,
}

impl Default for RumConfig {
	fn default() -> Self {
		Self {
			sample_rate: 100.0,
			track_background_events: false,
			session_inactivity: SESSION_INACTIVITY,
			session_max_duration: SESSION_MAX_DURATION,
			action_inactivity: ACTION_INACTIVITY,
			action_max_duration: ACTION_MAX_DURATION,
			view_update_interval: VIEW_UPDATE_INTERVAL,
			telemetry_sample_rate: TELEMETRY_SAMPLE_RATE,
			telemetry_configuration_sample_rate: TELEMETRY_CONFIGURATION_SAMPLE_RATE,
			telemetry_max_events_per_session: TELEMETRY_MAX_EVENTS_PER_SESSION,
		}
	}
}

impl RumConfig {
	/// Validates rates and durations.
	pub fn validate(&self) -> Result<(), RumError> {
		for rate in [
			self.sample_rate,
			self.telemetry_sample_rate,
			self.telemetry_configuration_sample_rate,
		] {
			if !(0.0..=100.0).contains(&rate) || rate.is_nan() {
				return Err(RumError::InvalidSampleRate(rate));
			}
		}
		let durations = [
			(self.session_inactivity, "session_inactivity"),
			(self.session_max_duration, "session_max_duration"),
			(self.action_inactivity, "action_inactivity"),
			(self.action_max_duration, "action_max_duration"),
			(self.view_update_interval, "view_update_interval"),
		];
		for (duration, field) in durations {
			if duration.is_zero() {
				return Err(RumError::InvalidDuration(field));
			}
		}
		Ok(())
	}
}
