// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The evaluation context the client sends along with each toggle fetch.
///
/// Mutating the context through the client is globally visible: every later
/// `is_enabled`/`get_variant` call from any consumer sees the new snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub remote_address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub app_name: Option<String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub properties: BTreeMap<String, String>,
}

impl EvaluationContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
		self.user_id = Some(user_id.into());
		self
	}

	pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
		self.session_id = Some(session_id.into());
		self
	}

	pub fn with_remote_address(mut self, remote_address: impl Into<String>) -> Self {
		self.remote_address = Some(remote_address.into());
		self
	}

	pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
		self.environment = Some(environment.into());
		self
	}

	pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
		self.app_name = Some(app_name.into());
		self
	}

	pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.properties.insert(key.into(), value.into());
		self
	}

	/// Overlays the fields set in `other` onto this context.
	///
	/// Static fields (`environment`, `app_name`) are kept from `self` when
	/// `other` leaves them unset; properties are merged key by key.
	pub fn merged_with(&self, other: &EvaluationContext) -> EvaluationContext {
		let mut merged = self.clone();
		if other.user_id.is_some() {
			merged.user_id = other.user_id.clone();
		}
		if other.session_id.is_some() {
			merged.session_id = other.session_id.clone();
		}
		if other.remote_address.is_some() {
			merged.remote_address = other.remote_address.clone();
		}
		if other.environment.is_some() {
			merged.environment = other.environment.clone();
		}
		if other.app_name.is_some() {
			merged.app_name = other.app_name.clone();
		}
		for (key, value) in &other.properties {
			merged.properties.insert(key.clone(), value.clone());
		}
		merged
	}
}
