// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the monitoring core.

use thiserror::Error;

/// Errors that can occur in the monitoring core.
#[derive(Debug, Error)]
pub enum RumError {
	/// Sample rate outside the [0, 100] percent range
	#[error("invalid sample rate: {0}")]
	InvalidSampleRate(f64),

	/// A duration configuration field was zero
	#[error("invalid duration for {0}: must be non-zero")]
	InvalidDuration(&'static str),

	/// Invalid session state string
	#[error("invalid session state: {0}")]
	InvalidSessionState(String),

	/// Invalid action kind string
	#[error("invalid action kind: {0}")]
	InvalidActionKind(String),

	/// Invalid resource kind string
	#[error("invalid resource kind: {0}")]
	InvalidResourceKind(String),

	/// Invalid HTTP method string
	#[error("invalid http method: {0}")]
	InvalidHttpMethod(String),

	/// Invalid error origin string
	#[error("invalid error origin: {0}")]
	InvalidErrorOrigin(String),

	/// Invalid telemetry kind string
	#[error("invalid telemetry kind: {0}")]
	InvalidTelemetryKind(String),

	/// Required monitor field missing at build time
	#[error("missing required field: {0}")]
	MissingField(&'static str),
}
