// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scope tracking one in-flight network call.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use trellis_rum_core::{
	Attributes, ErrorOrigin, ErrorRecord, ErrorResource, HttpMethod, RawEvent, ResourceId,
	ResourceKind, ResourceRecord, RumContext, RumRecord, ScopeKey, ViewId,
};

use super::{ScopeOutcome, Services};
use crate::sink::RecordSink;

/// One network call, from start to completion or error.
///
/// The context is captured at creation so the record keeps the action
/// attribution that was current when the call started.
pub(crate) struct ResourceScope {
	svc: Arc<Services>,
	key: ScopeKey,
	id: ResourceId,
	view_id: ViewId,
	context: RumContext,
	url: String,
	method: HttpMethod,
	attributes: Attributes,
	started_at: Duration,
	started_wall: DateTime<Utc>,
	emitted: bool,
}

impl ResourceScope {
	pub(crate) fn new(
		svc: Arc<Services>,
		context: RumContext,
		view_id: ViewId,
		key: ScopeKey,
		url: String,
		method: HttpMethod,
		attributes: Attributes,
	) -> Self {
		let started_at = svc.now();
		let started_wall = svc.clock.wall();
		Self {
			svc,
			key,
			id: ResourceId::new(),
			view_id,
			context,
			url,
			method,
			attributes,
			started_at,
			started_wall,
			emitted: false,
		}
	}

	pub(crate) fn handle_event(
		&mut self,
		event: &RawEvent,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) -> ScopeOutcome {
		// The instrumented request object may be gone without a stop event;
		// in that case the scope closes without emitting.
		if !self.svc.keys.is_alive(self.key) {
			debug!(
				resource_id = %self.id,
				url = %self.url,
				"resource key reclaimed without a stop, dropping"
			);
			feedback.push(RawEvent::DroppedResource {
				view_id: self.view_id,
			});
			return ScopeOutcome::Finished;
		}

		match event {
			RawEvent::StopResource {
				key,
				kind,
				status_code,
				size_bytes,
				attributes,
			} if *key == self.key => {
				self.stop(*kind, *status_code, *size_bytes, attributes, sink, feedback);
				ScopeOutcome::Finished
			}
			RawEvent::StopResourceWithError {
				key,
				message,
				origin,
				error_kind,
			} if *key == self.key => {
				self.fail(message, *origin, error_kind.clone(), sink, feedback);
				ScopeOutcome::Finished
			}
			_ => ScopeOutcome::Continue,
		}
	}

	fn stop(
		&mut self,
		kind: ResourceKind,
		status_code: Option<u16>,
		size_bytes: Option<u64>,
		attributes: &Attributes,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) {
		if self.emitted {
			return;
		}
		self.emitted = true;

		let mut merged = self.attributes.clone();
		merged.extend(attributes.clone());
		let duration = self.svc.now().saturating_sub(self.started_at);
		let record = ResourceRecord {
			id: self.id,
			url: self.url.clone(),
			method: self.method,
			kind,
			status_code,
			size_bytes,
			timestamp: self.started_wall,
			duration_ns: duration.as_nanos() as u64,
			attributes: merged,
		};
		sink.write(RumRecord::Resource(record), &self.context);
		feedback.push(RawEvent::SentResource {
			view_id: self.view_id,
		});
	}

	fn fail(
		&mut self,
		message: &str,
		origin: ErrorOrigin,
		error_kind: Option<String>,
		sink: &dyn RecordSink,
		feedback: &mut Vec<RawEvent>,
	) {
		if self.emitted {
			return;
		}
		self.emitted = true;

		let record = ErrorRecord {
			message: message.to_string(),
			origin,
			error_kind,
			is_crash: false,
			resource: Some(ErrorResource {
				url: self.url.clone(),
				method: self.method,
			}),
			timestamp: self.svc.clock.wall(),
			attributes: self.attributes.clone(),
		};
		sink.write(RumRecord::Error(record), &self.context);
		feedback.push(RawEvent::SentError {
			view_id: self.view_id,
			resource_id: Some(self.id),
		});
	}
}
