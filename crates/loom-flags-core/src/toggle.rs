// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

/// Name of the variant returned when a flag has no assignment.
pub const DISABLED_VARIANT: &str = "disabled";

/// Payload attached to a variant, e.g. a JSON document or a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPayload {
	#[serde(rename = "type")]
	pub payload_type: String,
	pub value: String,
}

impl VariantPayload {
	pub fn new(payload_type: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			payload_type: payload_type.into(),
			value: value.into(),
		}
	}

	/// Parses a `json` payload. Returns `None` for other payload types or malformed JSON.
	pub fn as_json(&self) -> Option<serde_json::Value> {
		if self.payload_type != "json" {
			return None;
		}
		serde_json::from_str(&self.value).ok()
	}
}

/// A named experiment arm assigned to the current context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
	pub name: String,
	pub enabled: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payload: Option<VariantPayload>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub feature_enabled: Option<bool>,
}

impl Variant {
	pub fn new(name: impl Into<String>, enabled: bool) -> Self {
		Self {
			name: name.into(),
			enabled,
			payload: None,
			feature_enabled: None,
		}
	}

	/// The `{ name: "disabled", enabled: false }` variant.
	pub fn disabled() -> Self {
		Self::new(DISABLED_VARIANT, false)
	}

	pub fn with_payload(mut self, payload: VariantPayload) -> Self {
		self.payload = Some(payload);
		self
	}

	pub fn with_feature_enabled(mut self, feature_enabled: bool) -> Self {
		self.feature_enabled = Some(feature_enabled);
		self
	}

	pub fn is_disabled_variant(&self) -> bool {
		self.name == DISABLED_VARIANT && !self.enabled
	}
}

impl Default for Variant {
	fn default() -> Self {
		Self::disabled()
	}
}

/// A feature flag as delivered in a toggle snapshot. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toggle {
	pub name: String,
	pub enabled: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub variant: Option<Variant>,
	#[serde(default)]
	pub impression_data: bool,
}

impl Toggle {
	pub fn new(name: impl Into<String>, enabled: bool) -> Self {
		Self {
			name: name.into(),
			enabled,
			variant: None,
			impression_data: false,
		}
	}

	pub fn with_variant(mut self, variant: Variant) -> Self {
		self.variant = Some(variant);
		self
	}

	pub fn with_impression_data(mut self, impression_data: bool) -> Self {
		self.impression_data = impression_data;
		self
	}

	/// The variant this toggle assigns, with `feature_enabled` filled in from the toggle.
	///
	/// Toggles without a variant resolve to [`Variant::disabled`].
	pub fn resolved_variant(&self) -> Variant {
		let mut variant = self.variant.clone().unwrap_or_default();
		variant.feature_enabled = Some(self.enabled);
		variant
	}
}

/// Finds a toggle by name in a snapshot.
pub fn find_toggle<'a>(toggles: &'a [Toggle], name: &str) -> Option<&'a Toggle> {
	toggles.iter().find(|t| t.name == name)
}
