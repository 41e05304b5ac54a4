// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The provider: owns one flag client per mounted subtree and republishes
//! its lifecycle events as reactive state.
//!
//! Host protocol:
//!
//! 1. [`FlagProvider::render`] on every render. The first call acquires the
//!    client; later calls reuse it.
//! 2. [`FlagProvider::mount`] once after the first commit. Registers the
//!    lifecycle handlers and starts the client.
//! 3. [`FlagProvider::unmount`] (or drop) when the subtree goes away.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use loom_flags::{
	ClientConfig, ClientEvent, EventHandler, EventPayload, FlagClient, FlagsError, LocalFlagClient,
};
use tracing::{debug, info, warn};

use crate::context::{FlagContext, FlagContextValue};
use crate::scheduler::Scheduler;
use crate::state::{StateSlot, Subscription};

/// Builds a client from a configuration.
pub type ClientFactory = Rc<dyn Fn(ClientConfig) -> Rc<dyn FlagClient>>;

/// The factory used when none is supplied: a [`LocalFlagClient`].
pub fn default_client_factory() -> ClientFactory {
	Rc::new(|config: ClientConfig| Rc::new(LocalFlagClient::new(config)) as Rc<dyn FlagClient>)
}

/// Inputs to a [`FlagProvider`].
#[derive(Clone, Default)]
pub struct ProviderProps {
	config: Option<ClientConfig>,
	client: Option<Rc<dyn FlagClient>>,
	start_client: Option<bool>,
	stop_client: Option<bool>,
	client_factory: Option<ClientFactory>,
	scheduler: Option<Scheduler>,
}

impl ProviderProps {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_config(mut self, config: ClientConfig) -> Self {
		self.config = Some(config);
		self
	}

	/// Adopts an existing client. A supplied client is never replaced and
	/// is not started unless [`ProviderProps::with_start_client`] says so.
	pub fn with_client(mut self, client: Rc<dyn FlagClient>) -> Self {
		self.client = Some(client);
		self
	}

	pub fn with_start_client(mut self, start: bool) -> Self {
		self.start_client = Some(start);
		self
	}

	pub fn with_stop_client(mut self, stop: bool) -> Self {
		self.stop_client = Some(stop);
		self
	}

	pub fn with_client_factory(mut self, factory: ClientFactory) -> Self {
		self.client_factory = Some(factory);
		self
	}

	/// Shares a host scheduler instead of giving the provider its own.
	pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
		self.scheduler = Some(scheduler);
		self
	}

	/// Defaults to true for a config-built client and false for a supplied one.
	pub fn start_client(&self) -> bool {
		self.start_client.unwrap_or(self.client.is_none())
	}

	pub fn stop_client(&self) -> bool {
		self.stop_client.unwrap_or(true)
	}
}

impl fmt::Debug for ProviderProps {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProviderProps")
			.field("config", &self.config)
			.field("client", &self.client.is_some())
			.field("start_client", &self.start_client())
			.field("stop_client", &self.stop_client())
			.field("client_factory", &self.client_factory.is_some())
			.finish()
	}
}

struct LifecycleHandlers {
	ready: EventHandler,
	error: EventHandler,
	recovered: EventHandler,
}

impl LifecycleHandlers {
	fn new(ready_state: &StateSlot<bool>, error_state: &StateSlot<Option<FlagsError>>) -> Self {
		let ready = {
			let ready_state = ready_state.clone();
			EventHandler::new(move |_| {
				if !ready_state.get() {
					debug!("flag client ready");
					ready_state.set(true);
				}
			})
		};

		let error = {
			let error_state = error_state.clone();
			EventHandler::new(move |payload: &EventPayload| {
				if let Some(reported) = payload.error() {
					if error_state.with(Option::is_none) {
						error_state.set(Some(reported.clone()));
					}
				}
			})
		};

		let recovered = {
			let error_state = error_state.clone();
			EventHandler::new(move |_| {
				if error_state.with(Option::is_some) {
					debug!("flag client recovered");
					error_state.set(None);
				}
			})
		};

		Self {
			ready,
			error,
			recovered,
		}
	}

	fn pairs(&self) -> [(ClientEvent, &EventHandler); 3] {
		[
			(ClientEvent::Ready, &self.ready),
			(ClientEvent::Error, &self.error),
			(ClientEvent::Recovered, &self.recovered),
		]
	}
}

struct ProviderInner {
	props: ProviderProps,
	scheduler: Scheduler,
	context: FlagContext,
	client: OnceCell<Rc<dyn FlagClient>>,
	is_initially_ready: Cell<bool>,
	ready: StateSlot<bool>,
	error: StateSlot<Option<FlagsError>>,
	bridge: RefCell<Option<Rc<FlagContextValue>>>,
	mounted: RefCell<Option<LifecycleHandlers>>,
}

impl ProviderInner {
	fn acquire_client(&self) -> Rc<dyn FlagClient> {
		Rc::clone(self.client.get_or_init(|| self.create_client()))
	}

	/// Whether the configuration alone makes flags evaluable. The offline
	/// fallback carries an empty bootstrap.
	fn bootstrapped(&self) -> bool {
		match (&self.props.config, &self.props.client) {
			(Some(config), _) => config.has_bootstrap(),
			(None, Some(_)) => false,
			(None, None) => true,
		}
	}

	fn create_client(&self) -> Rc<dyn FlagClient> {
		if let Some(client) = &self.props.client {
			debug!("adopting supplied flag client");
			self.is_initially_ready.set(self.bootstrapped() || client.is_ready());
			return Rc::clone(client);
		}

		let config = match &self.props.config {
			Some(config) => config.clone(),
			None => {
				warn!("FlagProvider needs either a config or a client, falling back to offline mode");
				ClientConfig::offline()
			}
		};
		self.is_initially_ready.set(config.has_bootstrap());

		info!(
			app_name = %config.app_name,
			bootstrapped = config.has_bootstrap(),
			"constructing flag client"
		);
		let factory = self
			.props
			.client_factory
			.clone()
			.unwrap_or_else(default_client_factory);
		factory(config)
	}

	/// The bridge for the current state, reusing the previous value when
	/// neither readiness nor error changed.
	fn bridge_value(&self, client: Rc<dyn FlagClient>) -> Rc<FlagContextValue> {
		let is_initially_ready = self.is_initially_ready.get();
		let flags_ready = self.ready.get() || is_initially_ready;
		let flags_error = self.error.get();

		let cached = self.bridge.borrow().clone();
		if let Some(current) = cached {
			if current.flags_ready() == flags_ready && current.flags_error() == flags_error.as_ref() {
				return current;
			}
		}

		let value = Rc::new(FlagContextValue::new(
			client,
			flags_ready,
			flags_error,
			is_initially_ready,
			self.scheduler.clone(),
		));
		*self.bridge.borrow_mut() = Some(Rc::clone(&value));
		value
	}

	fn render(&self) -> Rc<FlagContextValue> {
		let remounting = self.client.get().is_some() && self.bridge.borrow().is_none();
		let client = self.acquire_client();
		if remounting {
			self.is_initially_ready.set(self.bootstrapped() || client.is_ready());
		}
		let value = self.bridge_value(client);
		self.context.publish(Rc::clone(&value));
		value
	}

	/// Republishes after a state change. Does nothing while unmounted.
	fn republish(&self) {
		if self.client.get().is_some() && self.mounted.borrow().is_some() {
			self.render();
		}
	}

	fn mount(&self) {
		if self.mounted.borrow().is_some() {
			debug!("flag provider already mounted");
			return;
		}

		let client = self.acquire_client();
		let handlers = LifecycleHandlers::new(&self.ready, &self.error);
		for (event, handler) in handlers.pairs() {
			if let Err(err) = client.on(event, handler.clone()) {
				warn!(event = %event, error = %err, "failed to register provider handler");
			}
		}
		*self.mounted.borrow_mut() = Some(handlers);
		self.render();

		let start = self.props.start_client();
		if start {
			client.stop();
			client.start();
		}
		info!(started = start, "flag provider mounted");
	}

	fn unmount(&self) {
		let Some(handlers) = self.mounted.borrow_mut().take() else {
			return;
		};

		let stop = self.props.stop_client();
		if let Some(client) = self.client.get() {
			for (event, handler) in handlers.pairs() {
				client.off(event, handler);
			}
			if stop {
				client.stop();
			}
		}

		self.context.clear();
		self.bridge.borrow_mut().take();
		if self.ready.get() {
			self.ready.set(false);
		}
		if self.error.with(Option::is_some) {
			self.error.set(None);
		}
		info!(stopped = stop, "flag provider unmounted");
	}
}

/// Owns a flag client for a subtree and publishes a [`FlagContextValue`]
/// into its [`FlagContext`].
pub struct FlagProvider {
	inner: Rc<ProviderInner>,
	_state_subscriptions: [Subscription; 2],
}

impl FlagProvider {
	pub fn new(props: ProviderProps) -> Self {
		let scheduler = props.scheduler.clone().unwrap_or_default();
		let inner = Rc::new(ProviderInner {
			props,
			scheduler,
			context: FlagContext::empty(),
			client: OnceCell::new(),
			is_initially_ready: Cell::new(false),
			ready: StateSlot::new(false),
			error: StateSlot::new(None),
			bridge: RefCell::new(None),
			mounted: RefCell::new(None),
		});

		let weak = Rc::downgrade(&inner);
		let on_ready = inner.ready.subscribe(republish_on_change(weak.clone()));
		let on_error = inner.error.subscribe(republish_on_change(weak));

		Self {
			inner,
			_state_subscriptions: [on_ready, on_error],
		}
	}

	/// Acquires the client on first call and publishes the bridge value.
	pub fn render(&self) -> Rc<FlagContextValue> {
		self.inner.render()
	}

	/// Registers lifecycle handlers and, unless disabled, restarts the
	/// client. Further calls before [`FlagProvider::unmount`] do nothing.
	pub fn mount(&self) {
		self.inner.mount();
	}

	/// Removes exactly the handlers `mount` registered and, unless
	/// disabled, stops the client.
	pub fn unmount(&self) {
		self.inner.unmount();
	}

	pub fn is_mounted(&self) -> bool {
		self.inner.mounted.borrow().is_some()
	}

	/// The slot descendants read the bridge value from.
	pub fn context(&self) -> FlagContext {
		self.inner.context.clone()
	}

	pub fn scheduler(&self) -> Scheduler {
		self.inner.scheduler.clone()
	}

	/// The owned client, once the first render acquired it.
	pub fn client(&self) -> Option<Rc<dyn FlagClient>> {
		self.inner.client.get().cloned()
	}

	pub fn flags_ready(&self) -> bool {
		self.inner.ready.get() || self.inner.is_initially_ready.get()
	}

	pub fn flags_error(&self) -> Option<FlagsError> {
		self.inner.error.get()
	}

	pub fn is_initially_ready(&self) -> bool {
		self.inner.is_initially_ready.get()
	}

	pub fn props(&self) -> &ProviderProps {
		&self.inner.props
	}
}

impl Drop for FlagProvider {
	fn drop(&mut self) {
		self.inner.unmount();
	}
}

impl fmt::Debug for FlagProvider {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FlagProvider")
			.field("props", &self.inner.props)
			.field("mounted", &self.is_mounted())
			.field("flags_ready", &self.flags_ready())
			.field("flags_error", &self.flags_error())
			.finish()
	}
}

fn republish_on_change<T: 'static>(weak: Weak<ProviderInner>) -> impl Fn(&T) + 'static {
	move |_| {
		if let Some(inner) = weak.upgrade() {
			inner.republish();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use loom_flags::Toggle;

	fn bootstrap_config() -> ClientConfig {
		ClientConfig::new("https://flags.example.com/proxy", "proxy-secret", "web")
			.with_bootstrap(vec![Toggle::new("test-flag", true)])
			.with_disable_refresh(true)
	}

	#[test]
	fn start_client_defaults_depend_on_ownership() {
		let props = ProviderProps::new().with_config(bootstrap_config());
		assert!(props.start_client());
		assert!(props.stop_client());

		let client: Rc<dyn FlagClient> = Rc::new(LocalFlagClient::new(ClientConfig::offline()));
		let props = ProviderProps::new().with_client(client);
		assert!(!props.start_client());
		assert!(props.stop_client());

		let props = props.with_start_client(true).with_stop_client(false);
		assert!(props.start_client());
		assert!(!props.stop_client());
	}

	#[test]
	fn render_publishes_into_context() {
		let provider = FlagProvider::new(ProviderProps::new().with_config(bootstrap_config()));
		let context = provider.context();
		assert!(!context.is_provided());
		assert!(provider.client().is_none());

		let value = provider.render();
		assert!(context.is_provided());
		assert!(value.flags_ready());
		assert!(value.is_initially_ready());
		assert!(value.is_enabled("test-flag"));
	}

	#[test]
	fn bridge_is_stable_across_renders() {
		let provider = FlagProvider::new(ProviderProps::new().with_config(bootstrap_config()));
		let first = provider.render();
		let second = provider.render();
		assert!(Rc::ptr_eq(&first, &second));
		assert_eq!(provider.context().publications(), 1);
	}

	#[test]
	fn missing_config_falls_back_to_offline() {
		let provider = FlagProvider::new(ProviderProps::new());
		let value = provider.render();
		assert!(value.flags_ready());
		assert!(value.get_all_toggles().is_empty());
		assert!(!value.is_enabled("anything"));
	}

	#[test]
	fn mount_is_idempotent_and_unmount_clears_context() {
		let provider = FlagProvider::new(ProviderProps::new().with_config(bootstrap_config()));
		provider.render();
		provider.mount();
		provider.mount();
		assert!(provider.is_mounted());

		provider.unmount();
		assert!(!provider.is_mounted());
		assert!(!provider.context().is_provided());
	}
}
