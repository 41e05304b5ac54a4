// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Accessor hooks.
//!
//! A hook is created once per consuming component instance and dropped when
//! that instance unmounts. Each one reads its initial value synchronously,
//! subscribes to the client events it needs exactly once, and removes
//! exactly those handlers on drop.

mod client;
mod flag;
mod flags;
mod status;
mod variant;

use std::fmt;
use std::rc::Rc;

use loom_flags::{ClientEvent, EventHandler, FlagClient};
use tracing::warn;

use crate::context::FlagContextValue;

pub use client::{use_flag_client, use_update_context, UpdateContext};
pub use flag::{use_flag, FlagHook};
pub use flags::{use_flags, FlagsHook};
pub use status::{use_flags_status, FlagsStatus, FlagsStatusHook};
pub use variant::{same_variant, use_variant, VariantHook};

/// The `(event, handler)` pairs a hook registered, removed on drop.
struct HookSubscriptions {
	client: Option<Rc<dyn FlagClient>>,
	handlers: Vec<(ClientEvent, EventHandler)>,
}

impl HookSubscriptions {
	/// Subscriptions against the bridge's client. Outside a provider nothing
	/// is ever registered.
	fn new(bridge: &FlagContextValue) -> Self {
		let client = (!bridge.is_detached()).then(|| bridge.client());
		Self {
			client,
			handlers: Vec::new(),
		}
	}

	fn register(&mut self, event: ClientEvent, handler: EventHandler) {
		let Some(client) = &self.client else {
			return;
		};
		match client.on(event, handler.clone()) {
			Ok(()) => self.handlers.push((event, handler)),
			Err(err) => warn!(event = %event, error = %err, "hook handler not registered"),
		}
	}

	fn len(&self) -> usize {
		self.handlers.len()
	}
}

impl Drop for HookSubscriptions {
	fn drop(&mut self) {
		let Some(client) = &self.client else {
			return;
		};
		for (event, handler) in self.handlers.drain(..) {
			client.off(event, &handler);
		}
	}
}

impl fmt::Debug for HookSubscriptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let events: Vec<_> = self.handlers.iter().map(|(event, _)| *event).collect();
		f.debug_struct("HookSubscriptions")
			.field("attached", &self.client.is_some())
			.field("events", &events)
			.finish()
	}
}
