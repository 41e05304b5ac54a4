// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::rc::Rc;

use loom_flags::{ClientEvent, EventHandler, Variant};

use super::HookSubscriptions;
use crate::context::{lookup, FlagContext};
use crate::state::{Latest, StateSlot};

/// The fields two variants are compared on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VariantKey {
	name: String,
	enabled: bool,
	feature_enabled: Option<bool>,
	payload_type: Option<String>,
	payload_value: Option<String>,
}

impl From<&Variant> for VariantKey {
	fn from(variant: &Variant) -> Self {
		Self {
			name: variant.name.clone(),
			enabled: variant.enabled,
			feature_enabled: variant.feature_enabled,
			payload_type: variant.payload.as_ref().map(|p| p.payload_type.clone()),
			payload_value: variant.payload.as_ref().map(|p| p.value.clone()),
		}
	}
}

/// Structural equality on name, enablement, `feature_enabled` and payload
/// type and value. A missing payload equals only another missing payload.
pub fn same_variant(a: &Variant, b: &Variant) -> bool {
	VariantKey::from(a) == VariantKey::from(b)
}

/// Reactive variant assignment of one flag.
#[derive(Debug)]
pub struct VariantHook {
	name: String,
	state: StateSlot<Variant>,
	subscriptions: HookSubscriptions,
}

/// `update` commits only when [`same_variant`] says the variant changed;
/// `ready` always commits.
///
/// Outside a provider the hook holds [`Variant::disabled`].
pub fn use_variant(context: &FlagContext, name: impl Into<String>) -> VariantHook {
	let name = name.into();
	let bridge = lookup(context, "use_variant");
	let mut subscriptions = HookSubscriptions::new(&bridge);

	let initial = if bridge.is_detached() {
		Variant::disabled()
	} else {
		bridge.get_variant(&name)
	};
	let latest = Latest::new(VariantKey::from(&initial));
	let state = StateSlot::new(initial);
	let client = Rc::downgrade(&bridge.client());

	let on_update = {
		let (client, name, state, latest) = (client.clone(), name.clone(), state.clone(), latest.clone());
		EventHandler::new(move |_| {
			let Some(client) = client.upgrade() else {
				return;
			};
			let variant = client.get_variant(&name);
			let key = VariantKey::from(&variant);
			if latest.with(|last| *last != key) {
				latest.replace(key);
				state.set(variant);
			}
		})
	};

	let on_ready = {
		let (name, state, latest) = (name.clone(), state.clone(), latest);
		EventHandler::new(move |_| {
			let Some(client) = client.upgrade() else {
				return;
			};
			let variant = client.get_variant(&name);
			latest.replace(VariantKey::from(&variant));
			state.set(variant);
		})
	};

	subscriptions.register(ClientEvent::Update, on_update);
	subscriptions.register(ClientEvent::Ready, on_ready);

	VariantHook {
		name,
		state,
		subscriptions,
	}
}

impl VariantHook {
	pub fn get(&self) -> Variant {
		self.state.get()
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn state(&self) -> &StateSlot<Variant> {
		&self.state
	}

	pub fn handler_count(&self) -> usize {
		self.subscriptions.len()
	}
}
