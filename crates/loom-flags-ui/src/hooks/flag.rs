// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::rc::Rc;

use loom_flags::{ClientEvent, EventHandler};

use super::HookSubscriptions;
use crate::context::{lookup, FlagContext};
use crate::state::{Latest, StateSlot};

/// Reactive enablement of one flag.
#[derive(Debug)]
pub struct FlagHook {
	name: String,
	state: StateSlot<bool>,
	subscriptions: HookSubscriptions,
}

/// `update` commits only when the value changed; `ready` always commits.
pub fn use_flag(context: &FlagContext, name: impl Into<String>) -> FlagHook {
	let name = name.into();
	let bridge = lookup(context, "use_flag");
	let mut subscriptions = HookSubscriptions::new(&bridge);

	let initial = !bridge.is_detached() && bridge.is_enabled(&name);
	let state = StateSlot::new(initial);
	let latest = Latest::new(initial);
	let client = Rc::downgrade(&bridge.client());

	let on_update = {
		let (client, name, state, latest) = (client.clone(), name.clone(), state.clone(), latest.clone());
		EventHandler::new(move |_| {
			let Some(client) = client.upgrade() else {
				return;
			};
			let enabled = client.is_enabled(&name);
			if latest.get() != enabled {
				latest.replace(enabled);
				state.set(enabled);
			}
		})
	};

	let on_ready = {
		let (name, state, latest) = (name.clone(), state.clone(), latest);
		EventHandler::new(move |_| {
			let Some(client) = client.upgrade() else {
				return;
			};
			let enabled = client.is_enabled(&name);
			latest.replace(enabled);
			state.set(enabled);
		})
	};

	subscriptions.register(ClientEvent::Update, on_update);
	subscriptions.register(ClientEvent::Ready, on_ready);

	FlagHook {
		name,
		state,
		subscriptions,
	}
}

impl FlagHook {
	pub fn get(&self) -> bool {
		self.state.get()
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn state(&self) -> &StateSlot<bool> {
		&self.state
	}

	pub fn handler_count(&self) -> usize {
		self.subscriptions.len()
	}
}
