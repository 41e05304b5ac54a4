// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The bridge value published by [`FlagProvider`](crate::FlagProvider) and
//! the context slot descendants read it from.

use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use loom_flags::{
	ClientEvent, EvaluationContext, EventHandler, FlagClient, FlagsError, Result, Toggle, Variant,
};
use tracing::error;

use crate::scheduler::Scheduler;
use crate::state::{StateSlot, Subscription};

/// What a provider publishes to its subtree.
///
/// A new value is published only when `flags_ready` or `flags_error`
/// change, so holders can compare with [`Rc::ptr_eq`].
pub struct FlagContextValue {
	client: Rc<dyn FlagClient>,
	flags_ready: bool,
	flags_error: Option<FlagsError>,
	is_initially_ready: bool,
	scheduler: Scheduler,
	detached: bool,
}

impl FlagContextValue {
	pub(crate) fn new(
		client: Rc<dyn FlagClient>,
		flags_ready: bool,
		flags_error: Option<FlagsError>,
		is_initially_ready: bool,
		scheduler: Scheduler,
	) -> Self {
		Self {
			client,
			flags_ready,
			flags_error,
			is_initially_ready,
			scheduler,
			detached: false,
		}
	}

	/// The safe-default bridge handed out when no provider is mounted.
	pub fn detached() -> Self {
		Self {
			client: Rc::new(DetachedClient),
			flags_ready: false,
			flags_error: None,
			is_initially_ready: false,
			scheduler: Scheduler::new(),
			detached: true,
		}
	}

	pub fn client(&self) -> Rc<dyn FlagClient> {
		Rc::clone(&self.client)
	}

	pub fn flags_ready(&self) -> bool {
		self.flags_ready
	}

	pub fn flags_error(&self) -> Option<&FlagsError> {
		self.flags_error.as_ref()
	}

	/// Whether the provider's client held an authoritative snapshot before
	/// its first render.
	pub fn is_initially_ready(&self) -> bool {
		self.is_initially_ready
	}

	pub fn scheduler(&self) -> &Scheduler {
		&self.scheduler
	}

	/// True for the value returned outside any provider.
	pub fn is_detached(&self) -> bool {
		self.detached
	}

	pub fn is_enabled(&self, name: &str) -> bool {
		self.client.is_enabled(name)
	}

	pub fn get_variant(&self, name: &str) -> Variant {
		self.client.get_variant(name)
	}

	pub fn get_all_toggles(&self) -> Vec<Toggle> {
		self.client.get_all_toggles()
	}

	pub fn update_context(&self, context: EvaluationContext) -> LocalBoxFuture<'static, Result<()>> {
		let client = Rc::clone(&self.client);
		async move { client.update_context(context).await }.boxed_local()
	}

	pub fn on(&self, event: ClientEvent, handler: EventHandler) -> Result<()> {
		self.client.on(event, handler)
	}

	pub fn off(&self, event: ClientEvent, handler: &EventHandler) -> bool {
		self.client.off(event, handler)
	}
}

impl fmt::Debug for FlagContextValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FlagContextValue")
			.field("flags_ready", &self.flags_ready)
			.field("flags_error", &self.flags_error)
			.field("is_initially_ready", &self.is_initially_ready)
			.field("detached", &self.detached)
			.finish_non_exhaustive()
	}
}

/// A fully shaped client that evaluates nothing.
///
/// Every evaluation or subscription call logs which function was misused
/// and returns a harmless default. `start`, `stop`, `is_ready` and
/// `get_error` are silent no-ops.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedClient;

#[async_trait(?Send)]
impl FlagClient for DetachedClient {
	fn start(&self) {}

	fn stop(&self) {}

	fn is_enabled(&self, name: &str) -> bool {
		error!(flag = name, "is_enabled() must be used within a FlagProvider");
		false
	}

	fn get_variant(&self, name: &str) -> Variant {
		error!(flag = name, "get_variant() must be used within a FlagProvider");
		Variant::disabled()
	}

	fn get_all_toggles(&self) -> Vec<Toggle> {
		Vec::new()
	}

	async fn update_context(&self, _context: EvaluationContext) -> Result<()> {
		error!("update_context() must be used within a FlagProvider");
		Ok(())
	}

	fn get_context(&self) -> EvaluationContext {
		EvaluationContext::default()
	}

	fn on(&self, event: ClientEvent, _handler: EventHandler) -> Result<()> {
		error!(event = %event, "on() must be used within a FlagProvider");
		Ok(())
	}

	fn off(&self, event: ClientEvent, _handler: &EventHandler) -> bool {
		error!(event = %event, "off() must be used within a FlagProvider");
		false
	}
}

/// The slot a provider publishes its bridge value into.
///
/// Clones share the slot. An empty slot means "outside any provider".
#[derive(Clone)]
pub struct FlagContext {
	slot: StateSlot<Option<Rc<FlagContextValue>>>,
}

impl FlagContext {
	pub fn empty() -> Self {
		Self {
			slot: StateSlot::new(None),
		}
	}

	pub fn current(&self) -> Option<Rc<FlagContextValue>> {
		self.slot.get()
	}

	pub fn is_provided(&self) -> bool {
		self.slot.with(Option::is_some)
	}

	/// Number of values published so far, including clears.
	pub fn publications(&self) -> u64 {
		self.slot.commits()
	}

	/// Calls `callback` whenever a new bridge value is published.
	pub fn subscribe(&self, callback: impl Fn(Option<&Rc<FlagContextValue>>) + 'static) -> Subscription {
		self.slot.subscribe(move |value| callback(value.as_ref()))
	}

	/// Publishes `value` unless the same value is already published.
	pub(crate) fn publish(&self, value: Rc<FlagContextValue>) {
		let unchanged = self
			.slot
			.with(|current| current.as_ref().is_some_and(|c| Rc::ptr_eq(c, &value)));
		if !unchanged {
			self.slot.set(Some(value));
		}
	}

	pub(crate) fn clear(&self) {
		if self.is_provided() {
			self.slot.set(None);
		}
	}
}

impl Default for FlagContext {
	fn default() -> Self {
		Self::empty()
	}
}

impl fmt::Debug for FlagContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FlagContext")
			.field("current", &self.current())
			.field("publications", &self.publications())
			.finish()
	}
}

/// Returns the bridge value published into `context`.
///
/// Outside a provider this logs one diagnostic and returns
/// [`FlagContextValue::detached`].
pub fn use_flag_context(context: &FlagContext) -> Rc<FlagContextValue> {
	lookup(context, "use_flag_context")
}

pub(crate) fn lookup(context: &FlagContext, caller: &'static str) -> Rc<FlagContextValue> {
	match context.current() {
		Some(value) => value,
		None => {
			error!(caller, "{caller}() must be used within a FlagProvider");
			Rc::new(FlagContextValue::detached())
		}
	}
}
