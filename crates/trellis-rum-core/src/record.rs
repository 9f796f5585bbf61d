// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Aggregated output records written to the downstream sink.
//!
//! One record per completed session, view snapshot, action, resource call,
//! error, or accepted diagnostic telemetry event. All types are wire-ready
//! for the upload pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RumError;
use crate::event::Attributes;
use crate::session::{SessionId, SessionState};

/// Unique identifier for a view instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ViewId(pub Uuid);

impl ViewId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}

	#[must_use]
	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl Default for ViewId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for ViewId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for ViewId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Unique identifier for a user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActionId(pub Uuid);

impl ActionId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}

	#[must_use]
	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl Default for ActionId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for ActionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for ActionId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Unique identifier for a resource call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResourceId(pub Uuid);

impl ResourceId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}

	#[must_use]
	pub fn as_uuid(&self) -> &Uuid {
		&self.0
	}
}

impl Default for ResourceId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for ResourceId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for ResourceId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Kind of user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
	Tap,
	Scroll,
	Swipe,
	Click,
	Back,
	Custom,
	/// Synthesized action carrying the process startup latency
	ApplicationStart,
}

impl std::fmt::Display for ActionKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Tap => write!(f, "tap"),
			Self::Scroll => write!(f, "scroll"),
			Self::Swipe => write!(f, "swipe"),
			Self::Click => write!(f, "click"),
			Self::Back => write!(f, "back"),
			Self::Custom => write!(f, "custom"),
			Self::ApplicationStart => write!(f, "application_start"),
		}
	}
}

impl std::str::FromStr for ActionKind {
	type Err = RumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"tap" => Ok(Self::Tap),
			"scroll" => Ok(Self::Scroll),
			"swipe" => Ok(Self::Swipe),
			"click" => Ok(Self::Click),
			"back" => Ok(Self::Back),
			"custom" => Ok(Self::Custom),
			"application_start" => Ok(Self::ApplicationStart),
			_ => Err(RumError::InvalidActionKind(s.to_string())),
		}
	}
}

/// Kind of tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
	Document,
	Xhr,
	Fetch,
	Image,
	Js,
	Css,
	Font,
	Media,
	Native,
	Other,
}

impl std::fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Document => write!(f, "document"),
			Self::Xhr => write!(f, "xhr"),
			Self::Fetch => write!(f, "fetch"),
			Self::Image => write!(f, "image"),
			Self::Js => write!(f, "js"),
			Self::Css => write!(f, "css"),
			Self::Font => write!(f, "font"),
			Self::Media => write!(f, "media"),
			Self::Native => write!(f, "native"),
			Self::Other => write!(f, "other"),
		}
	}
}

impl std::str::FromStr for ResourceKind {
	type Err = RumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"document" => Ok(Self::Document),
			"xhr" => Ok(Self::Xhr),
			"fetch" => Ok(Self::Fetch),
			"image" => Ok(Self::Image),
			"js" => Ok(Self::Js),
			"css" => Ok(Self::Css),
			"font" => Ok(Self::Font),
			"media" => Ok(Self::Media),
			"native" => Ok(Self::Native),
			"other" => Ok(Self::Other),
			_ => Err(RumError::InvalidResourceKind(s.to_string())),
		}
	}
}

/// HTTP method of a tracked resource call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HttpMethod {
	Get,
	Post,
	Put,
	Delete,
	Patch,
	Head,
	Options,
}

impl std::fmt::Display for HttpMethod {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Get => write!(f, "GET"),
			Self::Post => write!(f, "POST"),
			Self::Put => write!(f, "PUT"),
			Self::Delete => write!(f, "DELETE"),
			Self::Patch => write!(f, "PATCH"),
			Self::Head => write!(f, "HEAD"),
			Self::Options => write!(f, "OPTIONS"),
		}
	}
}

impl std::str::FromStr for HttpMethod {
	type Err = RumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"GET" => Ok(Self::Get),
			"POST" => Ok(Self::Post),
			"PUT" => Ok(Self::Put),
			"DELETE" => Ok(Self::Delete),
			"PATCH" => Ok(Self::Patch),
			"HEAD" => Ok(Self::Head),
			"OPTIONS" => Ok(Self::Options),
			_ => Err(RumError::InvalidHttpMethod(s.to_string())),
		}
	}
}

/// Where an error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ErrorOrigin {
	Source,
	Network,
	Logger,
	Webview,
	Custom,
}

impl std::fmt::Display for ErrorOrigin {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Source => write!(f, "source"),
			Self::Network => write!(f, "network"),
			Self::Logger => write!(f, "logger"),
			Self::Webview => write!(f, "webview"),
			Self::Custom => write!(f, "custom"),
		}
	}
}

impl std::str::FromStr for ErrorOrigin {
	type Err = RumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"source" => Ok(Self::Source),
			"network" => Ok(Self::Network),
			"logger" => Ok(Self::Logger),
			"webview" => Ok(Self::Webview),
			"custom" => Ok(Self::Custom),
			_ => Err(RumError::InvalidErrorOrigin(s.to_string())),
		}
	}
}

/// Category of a diagnostic telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
	Debug,
	Error,
	Configuration,
}

impl std::fmt::Display for TelemetryKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Debug => write!(f, "debug"),
			Self::Error => write!(f, "error"),
			Self::Configuration => write!(f, "configuration"),
		}
	}
}

impl std::str::FromStr for TelemetryKind {
	type Err = RumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"debug" => Ok(Self::Debug),
			"error" => Ok(Self::Error),
			"configuration" => Ok(Self::Configuration),
			_ => Err(RumError::InvalidTelemetryKind(s.to_string())),
		}
	}
}

/// Snapshot of one view's lifetime.
///
/// A view emits a growing sequence of these; `version` starts at 1 and the
/// snapshot with the highest version supersedes the rest downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ViewRecord {
	pub id: ViewId,
	pub name: String,
	/// Wall-clock time the view started
	pub timestamp: DateTime<Utc>,
	/// Time on screen so far (or total, once stopped)
	pub duration_ns: u64,
	pub version: u64,
	pub action_count: u64,
	pub resource_count: u64,
	pub error_count: u64,
	pub crash_count: u64,
	/// False once the view has been stopped
	pub is_active: bool,
	#[serde(default)]
	pub attributes: Attributes,
}

/// One completed user action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActionRecord {
	pub id: ActionId,
	pub kind: ActionKind,
	pub name: String,
	pub timestamp: DateTime<Utc>,
	pub duration_ns: u64,
	pub resource_count: u64,
	pub error_count: u64,
	pub view_tree_change_count: u64,
	#[serde(default)]
	pub attributes: Attributes,
}

/// One completed resource call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResourceRecord {
	pub id: ResourceId,
	pub url: String,
	pub method: HttpMethod,
	pub kind: ResourceKind,
	pub status_code: Option<u16>,
	pub size_bytes: Option<u64>,
	pub timestamp: DateTime<Utc>,
	pub duration_ns: u64,
	#[serde(default)]
	pub attributes: Attributes,
}

/// Resource details attached to a network error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResource {
	pub url: String,
	pub method: HttpMethod,
}

/// One captured error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorRecord {
	pub message: String,
	pub origin: ErrorOrigin,
	/// Host-specific error type, when known
	pub error_kind: Option<String>,
	pub is_crash: bool,
	/// Present when the error terminated a resource call
	pub resource: Option<ErrorResource>,
	pub timestamp: DateTime<Utc>,
	#[serde(default)]
	pub attributes: Attributes,
}

/// One completed (superseded) session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SessionRecord {
	pub id: SessionId,
	pub state: SessionState,
	pub timestamp: DateTime<Utc>,
	pub duration_ns: u64,
}

/// One accepted diagnostic telemetry event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TelemetryRecord {
	pub kind: TelemetryKind,
	pub message: String,
	pub extra_kind: Option<String>,
	pub is_metric: bool,
	pub timestamp: DateTime<Utc>,
}

/// Any record the tree can emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RumRecord {
	Session(SessionRecord),
	View(ViewRecord),
	Action(ActionRecord),
	Resource(ResourceRecord),
	Error(ErrorRecord),
	Telemetry(TelemetryRecord),
}

impl RumRecord {
	/// Static label for diagnostics.
	#[must_use]
	pub fn kind_name(&self) -> &'static str {
		match self {
			Self::Session(_) => "session",
			Self::View(_) => "view",
			Self::Action(_) => "action",
			Self::Resource(_) => "resource",
			Self::Error(_) => "error",
			Self::Telemetry(_) => "telemetry",
		}
	}
}
