// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process flags client.
//!
//! [`LocalFlagClient`] keeps the current toggle snapshot in memory, evaluates
//! flags against it and emits lifecycle events as snapshots are applied. New
//! snapshots arrive either through a [`ToggleSource`](crate::ToggleSource)
//! (see [`LocalFlagClient::refresh`] and [`LocalFlagClient::run_refresh_loop`])
//! or directly through [`LocalFlagClient::apply_toggles`].
//!
//! # Event order
//!
//! Applying a snapshot emits `update`, then `ready` the first time the client
//! becomes authoritative, then `recovered` if an error was outstanding.

use std::cell::RefCell;

use async_trait::async_trait;
use loom_flags_core::{find_toggle, EvaluationContext, Toggle, Variant};
use tracing::{debug, info, warn};

use crate::client::FlagClient;
use crate::config::ClientConfig;
use crate::error::{FlagsError, Result};
use crate::event::{ClientEvent, EventHandler, EventPayload, HandlerRegistry};
use crate::storage::TOGGLES_KEY;

#[derive(Debug, Default)]
struct ClientState {
	toggles: Vec<Toggle>,
	context: EvaluationContext,
	started: bool,
	ready: bool,
	bootstrapped: bool,
	error: Option<FlagsError>,
}

/// A flags client that evaluates against an in-memory toggle snapshot.
pub struct LocalFlagClient {
	config: ClientConfig,
	registry: HandlerRegistry,
	state: RefCell<ClientState>,
}

impl LocalFlagClient {
	/// Creates a stopped client.
	///
	/// When the config carries an authoritative bootstrap, the snapshot is
	/// loaded immediately so evaluations are correct before `start`.
	/// Otherwise the last snapshot saved in the storage provider is restored.
	pub fn new(config: ClientConfig) -> Self {
		if let Err(e) = config.validate() {
			warn!(error = %e, "Flags client created with incomplete configuration");
		}

		let mut state = ClientState {
			context: config.initial_context(),
			..ClientState::default()
		};

		if config.has_bootstrap() {
			state.toggles = config.bootstrap.clone().unwrap_or_default();
			state.bootstrapped = true;
		} else {
			state.toggles = restore_toggles(&config);
		}

		info!(
			app_name = %config.app_name,
			toggles = state.toggles.len(),
			bootstrapped = state.bootstrapped,
			"Flags client initialized"
		);

		Self {
			config,
			registry: HandlerRegistry::new(),
			state: RefCell::new(state),
		}
	}

	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	pub fn is_started(&self) -> bool {
		self.state.borrow().started
	}

	/// Number of handlers currently registered for `event`.
	pub fn handler_count(&self, event: ClientEvent) -> usize {
		self.registry.handler_count(event)
	}

	/// Replaces the toggle snapshot and emits the resulting events.
	pub fn apply_toggles(&self, toggles: Vec<Toggle>) {
		let (became_ready, recovered) = {
			let mut state = self.state.borrow_mut();
			state.toggles = toggles;
			let became_ready = !state.ready;
			state.ready = true;
			(became_ready, state.error.take().is_some())
		};

		self.persist();
		debug!(
			toggles = self.state.borrow().toggles.len(),
			"Applied toggle snapshot"
		);

		self.registry.emit(ClientEvent::Update, &EventPayload::None);
		if became_ready {
			info!("Flags client ready");
			self.registry.emit(ClientEvent::Ready, &EventPayload::None);
		}
		if recovered {
			info!("Flags client recovered");
			self.registry.emit(ClientEvent::Recovered, &EventPayload::None);
		}
	}

	/// Records `error` as outstanding and emits it.
	pub fn report_error(&self, error: FlagsError) {
		warn!(error = %error, "Flags client error");
		self.state.borrow_mut().error = Some(error.clone());
		self
			.registry
			.emit(ClientEvent::Error, &EventPayload::Error(error));
	}

	/// Fetches a snapshot for the current context from the configured source.
	///
	/// Failures are reported through the `error` event and returned.
	pub async fn refresh(&self) -> Result<()> {
		let Some(source) = self.config.toggle_source.clone() else {
			debug!("No toggle source configured, skipping refresh");
			return Ok(());
		};

		let context = self.get_context();
		match source.fetch(&context).await {
			Ok(toggles) => {
				self.apply_toggles(toggles);
				Ok(())
			}
			Err(e) => {
				self.report_error(e.clone());
				Err(e)
			}
		}
	}

	/// Refreshes on every `refresh_interval` tick until the client is stopped.
	///
	/// The first tick fires immediately. Returns at once when refresh is
	/// disabled or the client is not started. Spawn it on a local task set.
	pub async fn run_refresh_loop(&self) {
		if self.config.disable_refresh {
			debug!("Refresh disabled, not polling");
			return;
		}

		let mut ticker = tokio::time::interval(self.config.refresh_interval());
		loop {
			ticker.tick().await;
			if !self.is_started() {
				debug!("Flags client stopped, ending refresh loop");
				break;
			}
			if let Err(e) = self.refresh().await {
				debug!(error = %e, "Refresh failed, will retry on next tick");
			}
		}
	}

	fn persist(&self) {
		let Some(storage) = self.config.storage_provider.as_ref() else {
			return;
		};

		let value = match serde_json::to_value(&self.state.borrow().toggles) {
			Ok(value) => value,
			Err(e) => {
				warn!(error = %e, "Failed to serialize toggle snapshot");
				return;
			}
		};

		if let Err(e) = storage.save(TOGGLES_KEY, value) {
			warn!(error = %e, "Failed to persist toggle snapshot");
		}
	}
}

fn restore_toggles(config: &ClientConfig) -> Vec<Toggle> {
	let Some(storage) = config.storage_provider.as_ref() else {
		return Vec::new();
	};

	match storage.get(TOGGLES_KEY) {
		Ok(Some(value)) => match serde_json::from_value(value) {
			Ok(toggles) => toggles,
			Err(e) => {
				warn!(error = %e, "Ignoring unreadable stored toggle snapshot");
				Vec::new()
			}
		},
		Ok(None) => Vec::new(),
		Err(e) => {
			warn!(error = %e, "Failed to read stored toggle snapshot");
			Vec::new()
		}
	}
}

#[async_trait(?Send)]
impl FlagClient for LocalFlagClient {
	fn start(&self) {
		let emit_ready = {
			let mut state = self.state.borrow_mut();
			if state.started {
				debug!("Flags client already started");
				return;
			}
			state.started = true;
			let emit_ready = state.bootstrapped && !state.ready;
			if emit_ready {
				state.ready = true;
			}
			emit_ready
		};

		info!(app_name = %self.config.app_name, "Flags client started");

		if emit_ready {
			self.persist();
			info!("Flags client ready from bootstrap");
			self.registry.emit(ClientEvent::Ready, &EventPayload::None);
		}
	}

	fn stop(&self) {
		let mut state = self.state.borrow_mut();
		if state.started {
			state.started = false;
			info!(app_name = %self.config.app_name, "Flags client stopped");
		}
	}

	fn is_enabled(&self, name: &str) -> bool {
		find_toggle(&self.state.borrow().toggles, name).is_some_and(|t| t.enabled)
	}

	fn get_variant(&self, name: &str) -> Variant {
		match find_toggle(&self.state.borrow().toggles, name) {
			Some(toggle) => toggle.resolved_variant(),
			None => Variant::disabled().with_feature_enabled(false),
		}
	}

	fn get_all_toggles(&self) -> Vec<Toggle> {
		self.state.borrow().toggles.clone()
	}

	async fn update_context(&self, context: EvaluationContext) -> Result<()> {
		let refresh = {
			let mut state = self.state.borrow_mut();
			let static_fields = EvaluationContext {
				app_name: state.context.app_name.clone(),
				environment: state.context.environment.clone(),
				..EvaluationContext::default()
			};
			state.context = static_fields.merged_with(&context);
			state.started && self.config.toggle_source.is_some()
		};

		debug!(refresh, "Evaluation context updated");

		if refresh {
			if let Err(e) = self.refresh().await {
				debug!(error = %e, "Refresh after context update failed");
			}
		}
		Ok(())
	}

	fn get_context(&self) -> EvaluationContext {
		self.state.borrow().context.clone()
	}

	fn on(&self, event: ClientEvent, handler: EventHandler) -> Result<()> {
		self.registry.on(event, handler)
	}

	fn off(&self, event: ClientEvent, handler: &EventHandler) -> bool {
		self.registry.off(event, handler)
	}

	fn is_ready(&self) -> bool {
		self.state.borrow().ready
	}

	fn get_error(&self) -> Option<FlagsError> {
		self.state.borrow().error.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;
	use std::collections::VecDeque;
	use std::rc::Rc;

	use crate::source::ToggleSource;
	use crate::storage::{InMemoryStorageProvider, StorageProvider};

	fn config() -> ClientConfig {
		ClientConfig::new("https://flags.example.com/proxy", "proxy-secret", "web")
	}

	fn record(client: &LocalFlagClient, log: &Rc<RefCell<Vec<String>>>) {
		for event in ClientEvent::ALL {
			let log = Rc::clone(log);
			client
				.on(
					event,
					EventHandler::new(move |payload| {
						let entry = match payload.error() {
							Some(err) => format!("{event}:{err}"),
							None => event.to_string(),
						};
						log.borrow_mut().push(entry);
					}),
				)
				.unwrap();
		}
	}

	#[derive(Default)]
	struct ScriptedSource {
		responses: RefCell<VecDeque<Result<Vec<Toggle>>>>,
		contexts: RefCell<Vec<EvaluationContext>>,
	}

	impl ScriptedSource {
		fn push(&self, response: Result<Vec<Toggle>>) {
			self.responses.borrow_mut().push_back(response);
		}
	}

	#[async_trait(?Send)]
	impl ToggleSource for ScriptedSource {
		async fn fetch(&self, context: &EvaluationContext) -> Result<Vec<Toggle>> {
			self.contexts.borrow_mut().push(context.clone());
			self
				.responses
				.borrow_mut()
				.pop_front()
				.unwrap_or_else(|| Ok(Vec::new()))
		}
	}

	#[test]
	fn bootstrap_is_evaluated_before_start() {
		let client = LocalFlagClient::new(config().with_bootstrap(vec![Toggle::new(
			"test-flag",
			true,
		)
		.with_variant(Variant::new("A", true))]));

		assert!(!client.is_started());
		assert!(!client.is_ready());
		assert!(client.is_enabled("test-flag"));
		assert_eq!(client.get_variant("test-flag").name, "A");
		assert!(!client.is_enabled("unknown"));
		assert_eq!(client.get_variant("unknown").name, "disabled");
	}

	#[test]
	fn bootstrap_override_false_ignores_bootstrap() {
		let client = LocalFlagClient::new(
			config()
				.with_bootstrap(vec![Toggle::new("test-flag", true)])
				.with_bootstrap_override(false),
		);
		assert!(!client.is_enabled("test-flag"));
	}

	#[test]
	fn start_emits_ready_once_when_bootstrapped() {
		let client = LocalFlagClient::new(config().with_bootstrap(vec![Toggle::new("a", true)]));
		let log = Rc::new(RefCell::new(Vec::new()));
		record(&client, &log);

		client.start();
		client.start();
		client.stop();
		client.start();

		assert!(client.is_ready());
		assert_eq!(*log.borrow(), vec!["ready"]);
	}

	#[test]
	fn start_without_bootstrap_waits_for_snapshot() {
		let client = LocalFlagClient::new(config());
		let log = Rc::new(RefCell::new(Vec::new()));
		record(&client, &log);

		client.start();
		assert!(!client.is_ready());
		assert!(log.borrow().is_empty());

		client.apply_toggles(vec![Toggle::new("a", true)]);
		client.apply_toggles(vec![Toggle::new("a", false)]);

		assert_eq!(*log.borrow(), vec!["update", "ready", "update"]);
		assert!(!client.is_enabled("a"));
	}

	#[test]
	fn stop_before_start_is_safe() {
		let client = LocalFlagClient::new(config());
		client.stop();
		assert!(!client.is_started());
	}

	#[test]
	fn error_then_snapshot_recovers() {
		let client = LocalFlagClient::new(config());
		let log = Rc::new(RefCell::new(Vec::new()));
		record(&client, &log);

		client.apply_toggles(Vec::new());
		client.report_error(FlagsError::Network("connection reset".to_string()));
		assert_eq!(
			client.get_error(),
			Some(FlagsError::Network("connection reset".to_string()))
		);

		client.apply_toggles(Vec::new());
		assert_eq!(client.get_error(), None);
		assert_eq!(
			*log.borrow(),
			vec![
				"update",
				"ready",
				"error:network error: connection reset",
				"update",
				"recovered",
			]
		);
	}

	#[test]
	fn variant_carries_feature_enabled() {
		let client = LocalFlagClient::new(config().with_bootstrap(vec![Toggle::new("off", false)
			.with_variant(Variant::new("A", true))]));
		let variant = client.get_variant("off");
		assert_eq!(variant.name, "A");
		assert_eq!(variant.feature_enabled, Some(false));
		assert_eq!(client.get_variant("missing").feature_enabled, Some(false));
	}

	#[test]
	fn snapshot_is_persisted_and_restored() {
		let storage = Rc::new(InMemoryStorageProvider::new());
		let first = LocalFlagClient::new(config().with_storage_provider(storage.clone()));
		first.apply_toggles(vec![Toggle::new("cached", true)]);
		assert!(storage.get(TOGGLES_KEY).unwrap().is_some());

		let second = LocalFlagClient::new(config().with_storage_provider(storage));
		assert!(second.is_enabled("cached"));
		assert!(!second.is_ready());
	}

	#[test]
	fn unreadable_storage_is_ignored() {
		let storage = Rc::new(InMemoryStorageProvider::new());
		storage
			.save(TOGGLES_KEY, serde_json::json!({"not": "a list"}))
			.unwrap();
		let client = LocalFlagClient::new(config().with_storage_provider(storage));
		assert!(client.get_all_toggles().is_empty());
	}

	#[tokio::test]
	async fn refresh_applies_source_snapshot() {
		let source = Rc::new(ScriptedSource::default());
		source.push(Ok(vec![Toggle::new("remote", true)]));
		let client = LocalFlagClient::new(config().with_toggle_source(source.clone()));

		client.refresh().await.unwrap();
		assert!(client.is_enabled("remote"));
		assert!(client.is_ready());
		assert_eq!(source.contexts.borrow()[0].app_name.as_deref(), Some("web"));
	}

	#[tokio::test]
	async fn refresh_failure_emits_error() {
		let source = Rc::new(ScriptedSource::default());
		source.push(Err(FlagsError::FetchFailed {
			status: 500,
			message: "boom".to_string(),
		}));
		let client = LocalFlagClient::new(config().with_toggle_source(source));
		let log = Rc::new(RefCell::new(Vec::new()));
		record(&client, &log);

		assert!(client.refresh().await.is_err());
		assert_eq!(*log.borrow(), vec!["error:fetch failed (500): boom"]);
		assert!(!client.is_ready());
	}

	#[test]
	fn refresh_without_source_is_noop() {
		let client = LocalFlagClient::new(config());
		tokio_test::block_on(client.refresh()).unwrap();
		assert!(!client.is_ready());
	}

	#[test]
	fn update_context_before_start_does_not_fetch() {
		let source = Rc::new(ScriptedSource::default());
		let client = LocalFlagClient::new(config().with_toggle_source(source.clone()));

		tokio_test::block_on(client.update_context(EvaluationContext::new().with_session_id("s1")))
			.unwrap();
		assert_eq!(client.get_context().session_id.as_deref(), Some("s1"));
		assert!(source.contexts.borrow().is_empty());
	}

	#[tokio::test]
	async fn update_context_keeps_static_fields_and_refreshes_when_started() {
		let source = Rc::new(ScriptedSource::default());
		source.push(Ok(vec![Toggle::new("for-user", true)]));
		let client = LocalFlagClient::new(
			config()
				.with_environment("prod")
				.with_toggle_source(source.clone()),
		);

		client
			.update_context(EvaluationContext::new().with_user_id("u1"))
			.await
			.unwrap();
		assert!(source.contexts.borrow().is_empty());

		client.start();
		client
			.update_context(EvaluationContext::new().with_user_id("u2"))
			.await
			.unwrap();

		let ctx = client.get_context();
		assert_eq!(ctx.user_id.as_deref(), Some("u2"));
		assert_eq!(ctx.app_name.as_deref(), Some("web"));
		assert_eq!(ctx.environment.as_deref(), Some("prod"));
		assert_eq!(source.contexts.borrow().len(), 1);
		assert!(client.is_enabled("for-user"));
	}

	#[tokio::test]
	async fn refresh_loop_exits_when_not_started() {
		let source = Rc::new(ScriptedSource::default());
		let client = LocalFlagClient::new(config().with_toggle_source(source.clone()));

		client.run_refresh_loop().await;
		assert!(source.contexts.borrow().is_empty());
	}

	#[tokio::test]
	async fn refresh_loop_respects_disable_refresh() {
		let source = Rc::new(ScriptedSource::default());
		let client = LocalFlagClient::new(
			config()
				.with_toggle_source(source.clone())
				.with_disable_refresh(true),
		);
		client.start();

		client.run_refresh_loop().await;
		assert!(source.contexts.borrow().is_empty());
	}

	#[test]
	fn off_deregisters() {
		let client = LocalFlagClient::new(config());
		let handler = EventHandler::new(|_| {});
		client.on(ClientEvent::Update, handler.clone()).unwrap();
		assert_eq!(client.handler_count(ClientEvent::Update), 1);
		assert!(client.off(ClientEvent::Update, &handler));
		assert_eq!(client.handler_count(ClientEvent::Update), 0);
	}
}
