// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistence for the last applied toggle snapshot.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::Result;

/// Key under which the client stores its toggle snapshot.
pub const TOGGLES_KEY: &str = "repo";

/// Key/value storage for client state.
pub trait StorageProvider {
	fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

	fn save(&self, key: &str, value: serde_json::Value) -> Result<()>;
}

/// Process-local storage. Contents are lost when the provider is dropped.
#[derive(Debug, Default)]
pub struct InMemoryStorageProvider {
	entries: RefCell<HashMap<String, serde_json::Value>>,
}

impl InMemoryStorageProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.borrow().is_empty()
	}
}

impl StorageProvider for InMemoryStorageProvider {
	fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
		Ok(self.entries.borrow().get(key).cloned())
	}

	fn save(&self, key: &str, value: serde_json::Value) -> Result<()> {
		self.entries.borrow_mut().insert(key.to_string(), value);
		Ok(())
	}
}
