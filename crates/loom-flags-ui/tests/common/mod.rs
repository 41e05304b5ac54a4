// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared fixtures: a recording client and a diagnostics capture layer.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use loom_flags::{
	ClientEvent, EvaluationContext, EventHandler, EventPayload, FlagClient, FlagsError,
	HandlerRegistry, Result, Toggle, Variant,
};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// A client call observed by [`RecordingClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Start,
	Stop,
	On(ClientEvent, EventHandler),
	Off(ClientEvent, EventHandler),
	UpdateContext(EvaluationContext),
}

/// A [`FlagClient`] that evaluates a fixed snapshot, emits events on demand
/// and records every lifecycle and subscription call.
#[derive(Default)]
pub struct RecordingClient {
	registry: HandlerRegistry,
	toggles: RefCell<Vec<Toggle>>,
	context: RefCell<EvaluationContext>,
	ready: Cell<bool>,
	error: RefCell<Option<FlagsError>>,
	calls: RefCell<Vec<Call>>,
	enabled_lookups: Cell<usize>,
}

impl RecordingClient {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_toggles(toggles: Vec<Toggle>) -> Self {
		let client = Self::new();
		client.set_toggles(toggles);
		client
	}

	/// Replaces the snapshot without emitting anything.
	pub fn set_toggles(&self, toggles: Vec<Toggle>) {
		*self.toggles.borrow_mut() = toggles;
	}

	pub fn set_ready(&self, ready: bool) {
		self.ready.set(ready);
	}

	pub fn set_error(&self, error: Option<FlagsError>) {
		*self.error.borrow_mut() = error;
	}

	pub fn emit(&self, event: ClientEvent) -> usize {
		self.registry.emit(event, &EventPayload::None)
	}

	pub fn emit_error(&self, error: FlagsError) -> usize {
		self.registry.emit(ClientEvent::Error, &EventPayload::Error(error))
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.borrow().clone()
	}

	pub fn starts(&self) -> usize {
		self.count(|c| matches!(c, Call::Start))
	}

	pub fn stops(&self) -> usize {
		self.count(|c| matches!(c, Call::Stop))
	}

	pub fn ons(&self) -> Vec<(ClientEvent, EventHandler)> {
		self
			.calls
			.borrow()
			.iter()
			.filter_map(|c| match c {
				Call::On(event, handler) => Some((*event, handler.clone())),
				_ => None,
			})
			.collect()
	}

	pub fn offs(&self) -> Vec<(ClientEvent, EventHandler)> {
		self
			.calls
			.borrow()
			.iter()
			.filter_map(|c| match c {
				Call::Off(event, handler) => Some((*event, handler.clone())),
				_ => None,
			})
			.collect()
	}

	pub fn handler_count(&self, event: ClientEvent) -> usize {
		self.registry.handler_count(event)
	}

	pub fn total_handlers(&self) -> usize {
		self.registry.total_handlers()
	}

	pub fn enabled_lookups(&self) -> usize {
		self.enabled_lookups.get()
	}

	fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
		self.calls.borrow().iter().filter(|c| pred(c)).count()
	}

	fn record(&self, call: Call) {
		self.calls.borrow_mut().push(call);
	}
}

#[async_trait(?Send)]
impl FlagClient for RecordingClient {
	fn start(&self) {
		self.record(Call::Start);
	}

	fn stop(&self) {
		self.record(Call::Stop);
	}

	fn is_enabled(&self, name: &str) -> bool {
		self.enabled_lookups.set(self.enabled_lookups.get() + 1);
		self
			.toggles
			.borrow()
			.iter()
			.any(|t| t.name == name && t.enabled)
	}

	fn get_variant(&self, name: &str) -> Variant {
		self
			.toggles
			.borrow()
			.iter()
			.find(|t| t.name == name)
			.map(Toggle::resolved_variant)
			.unwrap_or_else(Variant::disabled)
	}

	fn get_all_toggles(&self) -> Vec<Toggle> {
		self.toggles.borrow().clone()
	}

	async fn update_context(&self, context: EvaluationContext) -> Result<()> {
		self.record(Call::UpdateContext(context.clone()));
		*self.context.borrow_mut() = context;
		Ok(())
	}

	fn get_context(&self) -> EvaluationContext {
		self.context.borrow().clone()
	}

	fn on(&self, event: ClientEvent, handler: EventHandler) -> Result<()> {
		self.record(Call::On(event, handler.clone()));
		self.registry.on(event, handler)
	}

	fn off(&self, event: ClientEvent, handler: &EventHandler) -> bool {
		self.record(Call::Off(event, handler.clone()));
		self.registry.off(event, handler)
	}

	fn is_ready(&self) -> bool {
		self.ready.get()
	}

	fn get_error(&self) -> Option<FlagsError> {
		self.error.borrow().clone()
	}
}

/// One captured `tracing` event.
#[derive(Debug, Clone)]
pub struct Diagnostic {
	pub level: Level,
	pub message: String,
}

#[derive(Clone, Default)]
struct CaptureLayer {
	events: Arc<Mutex<Vec<Diagnostic>>>,
}

#[derive(Default)]
struct MessageVisitor {
	message: String,
}

impl Visit for MessageVisitor {
	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		if field.name() == "message" {
			self.message = format!("{value:?}");
		}
	}
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
	fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
		let mut visitor = MessageVisitor::default();
		event.record(&mut visitor);
		self.events.lock().unwrap().push(Diagnostic {
			level: *event.metadata().level(),
			message: visitor.message,
		});
	}
}

/// Runs `f` with a subscriber that records every event it emits.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<Diagnostic>) {
	let layer = CaptureLayer::default();
	let events = Arc::clone(&layer.events);
	let subscriber = tracing_subscriber::registry().with(layer);
	let result = tracing::subscriber::with_default(subscriber, f);
	let events = events.lock().unwrap().clone();
	(result, events)
}

pub fn errors(diagnostics: &[Diagnostic]) -> Vec<&Diagnostic> {
	diagnostics.iter().filter(|d| d.level == Level::ERROR).collect()
}

pub fn warnings(diagnostics: &[Diagnostic]) -> Vec<&Diagnostic> {
	diagnostics.iter().filter(|d| d.level == Level::WARN).collect()
}
