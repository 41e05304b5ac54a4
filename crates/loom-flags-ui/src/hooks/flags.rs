// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::rc::Rc;

use loom_flags::{ClientEvent, EventHandler, Toggle};

use super::HookSubscriptions;
use crate::context::{lookup, FlagContext};
use crate::state::StateSlot;

/// Reactive list of every toggle in the current snapshot.
///
/// Every `update` commits; the list is not diffed.
#[derive(Debug)]
pub struct FlagsHook {
	state: StateSlot<Vec<Toggle>>,
	subscriptions: HookSubscriptions,
}

pub fn use_flags(context: &FlagContext) -> FlagsHook {
	let bridge = lookup(context, "use_flags");
	let mut subscriptions = HookSubscriptions::new(&bridge);

	let state = StateSlot::new(bridge.get_all_toggles());

	let on_update = {
		let client = Rc::downgrade(&bridge.client());
		let state = state.clone();
		EventHandler::new(move |_| {
			if let Some(client) = client.upgrade() {
				state.set(client.get_all_toggles());
			}
		})
	};
	subscriptions.register(ClientEvent::Update, on_update);

	FlagsHook {
		state,
		subscriptions,
	}
}

impl FlagsHook {
	pub fn get(&self) -> Vec<Toggle> {
		self.state.get()
	}

	pub fn state(&self) -> &StateSlot<Vec<Toggle>> {
		&self.state
	}

	pub fn handler_count(&self) -> usize {
		self.subscriptions.len()
	}
}
