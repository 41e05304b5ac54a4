// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client configuration.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use loom_flags_core::{EvaluationContext, Toggle};
use serde::Deserialize;

use crate::error::{FlagsError, Result};
use crate::source::ToggleSource;
use crate::storage::StorageProvider;

/// Default refresh interval in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

const OFFLINE_URL: &str = "http://localhost";
const OFFLINE_APP_NAME: &str = "offline";
const OFFLINE_CLIENT_KEY: &str = "not-used";

fn default_refresh_interval() -> u64 {
	DEFAULT_REFRESH_INTERVAL_SECS
}

/// Configuration used to construct a client.
///
/// Keys are camelCase in JSON and TOML documents. The storage provider and
/// toggle source cannot be expressed in a document and are attached with
/// [`ClientConfig::with_storage_provider`] and
/// [`ClientConfig::with_toggle_source`].
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
	pub app_name: String,
	pub client_key: String,
	pub url: String,
	/// Seconds between background refreshes.
	#[serde(default = "default_refresh_interval")]
	pub refresh_interval: u64,
	#[serde(default)]
	pub disable_refresh: bool,
	#[serde(default)]
	pub disable_metrics: bool,
	#[serde(default)]
	pub bootstrap: Option<Vec<Toggle>>,
	#[serde(default)]
	pub bootstrap_override: Option<bool>,
	#[serde(default)]
	pub environment: Option<String>,
	#[serde(default)]
	pub context: EvaluationContext,
	#[serde(skip)]
	pub storage_provider: Option<Rc<dyn StorageProvider>>,
	#[serde(skip)]
	pub toggle_source: Option<Rc<dyn ToggleSource>>,
}

impl ClientConfig {
	pub fn new(
		url: impl Into<String>,
		client_key: impl Into<String>,
		app_name: impl Into<String>,
	) -> Self {
		Self {
			app_name: app_name.into(),
			client_key: client_key.into(),
			url: url.into(),
			refresh_interval: DEFAULT_REFRESH_INTERVAL_SECS,
			disable_refresh: false,
			disable_metrics: false,
			bootstrap: None,
			bootstrap_override: None,
			environment: None,
			context: EvaluationContext::default(),
			storage_provider: None,
			toggle_source: None,
		}
	}

	/// A configuration that never talks to a server: empty bootstrap,
	/// refresh and metrics disabled, placeholder localhost URL.
	pub fn offline() -> Self {
		Self::new(OFFLINE_URL, OFFLINE_CLIENT_KEY, OFFLINE_APP_NAME)
			.with_bootstrap(Vec::new())
			.with_disable_refresh(true)
			.with_disable_metrics(true)
	}

	pub fn from_toml_str(s: &str) -> Result<Self> {
		toml::from_str(s).map_err(|e| FlagsError::Parse(e.to_string()))
	}

	pub fn from_json_str(s: &str) -> Result<Self> {
		serde_json::from_str(s).map_err(|e| FlagsError::Parse(e.to_string()))
	}

	pub fn with_bootstrap(mut self, toggles: Vec<Toggle>) -> Self {
		self.bootstrap = Some(toggles);
		self
	}

	pub fn with_bootstrap_override(mut self, bootstrap_override: bool) -> Self {
		self.bootstrap_override = Some(bootstrap_override);
		self
	}

	pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
		self.refresh_interval = interval.as_secs().max(1);
		self
	}

	pub fn with_disable_refresh(mut self, disable: bool) -> Self {
		self.disable_refresh = disable;
		self
	}

	pub fn with_disable_metrics(mut self, disable: bool) -> Self {
		self.disable_metrics = disable;
		self
	}

	pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
		self.environment = Some(environment.into());
		self
	}

	pub fn with_context(mut self, context: EvaluationContext) -> Self {
		self.context = context;
		self
	}

	pub fn with_storage_provider(mut self, storage: Rc<dyn StorageProvider>) -> Self {
		self.storage_provider = Some(storage);
		self
	}

	pub fn with_toggle_source(mut self, source: Rc<dyn ToggleSource>) -> Self {
		self.toggle_source = Some(source);
		self
	}

	pub fn refresh_interval(&self) -> Duration {
		Duration::from_secs(self.refresh_interval.max(1))
	}

	/// True when the bootstrap snapshot is authoritative: a bootstrap is
	/// present (even an empty one) and `bootstrapOverride` is not `false`.
	pub fn has_bootstrap(&self) -> bool {
		self.bootstrap.is_some() && self.bootstrap_override != Some(false)
	}

	/// The initial evaluation context: the configured context with
	/// `appName` and `environment` filled in.
	pub fn initial_context(&self) -> EvaluationContext {
		let mut context = self.context.clone();
		if context.app_name.is_none() {
			context.app_name = Some(self.app_name.clone());
		}
		if context.environment.is_none() {
			context.environment = self.environment.clone();
		}
		context
	}

	pub fn validate(&self) -> Result<()> {
		if self.url.trim().is_empty() {
			return Err(FlagsError::InvalidConfig("url is required".to_string()));
		}
		if self.client_key.trim().is_empty() {
			return Err(FlagsError::InvalidConfig("clientKey is required".to_string()));
		}
		if self.app_name.trim().is_empty() {
			return Err(FlagsError::InvalidConfig("appName is required".to_string()));
		}
		Ok(())
	}
}

impl fmt::Debug for ClientConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientConfig")
			.field("app_name", &self.app_name)
			.field("client_key", &"[REDACTED]")
			.field("url", &self.url)
			.field("refresh_interval", &self.refresh_interval)
			.field("disable_refresh", &self.disable_refresh)
			.field("disable_metrics", &self.disable_metrics)
			.field("bootstrap", &self.bootstrap.as_ref().map(Vec::len))
			.field("bootstrap_override", &self.bootstrap_override)
			.field("environment", &self.environment)
			.field("storage_provider", &self.storage_provider.is_some())
			.field("toggle_source", &self.toggle_source.is_some())
			.finish()
	}
}
