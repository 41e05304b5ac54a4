// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::cell::RefCell;
use std::rc::Rc;

use loom_flags::{ClientEvent, EventHandler, EventPayload, FlagsError};

use super::HookSubscriptions;
use crate::context::{lookup, FlagContext};
use crate::scheduler::TaskHandle;
use crate::state::StateSlot;

/// Readiness and error state of the provider's client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagsStatus {
	pub flags_ready: bool,
	pub flags_error: Option<FlagsError>,
}

/// Reactive `{ ready, error }` for the nearest provider.
///
/// `ready` flips one scheduler tick after the client's `ready` event so that
/// flag and variant hooks resynchronise first.
#[derive(Debug)]
pub struct FlagsStatusHook {
	state: StateSlot<FlagsStatus>,
	pending_ready: Rc<RefCell<Option<TaskHandle>>>,
	subscriptions: HookSubscriptions,
}

pub fn use_flags_status(context: &FlagContext) -> FlagsStatusHook {
	let bridge = lookup(context, "use_flags_status");
	let mut subscriptions = HookSubscriptions::new(&bridge);

	let initial = if bridge.is_detached() {
		FlagsStatus::default()
	} else {
		let client = bridge.client();
		FlagsStatus {
			flags_ready: bridge.flags_ready() || bridge.is_initially_ready() || client.is_ready(),
			flags_error: bridge.flags_error().cloned().or_else(|| client.get_error()),
		}
	};
	let state = StateSlot::new(initial);
	let pending_ready: Rc<RefCell<Option<TaskHandle>>> = Rc::new(RefCell::new(None));

	let on_ready = {
		let state = state.clone();
		let scheduler = bridge.scheduler().clone();
		let pending_ready = Rc::clone(&pending_ready);
		EventHandler::new(move |_| {
			let state = state.clone();
			let handle = scheduler.defer(move || {
				if !state.with(|current| current.flags_ready) {
					state.update(|current| FlagsStatus {
						flags_ready: true,
						..current.clone()
					});
				}
			});
			if let Some(previous) = pending_ready.borrow_mut().replace(handle) {
				previous.cancel();
			}
		})
	};

	let on_error = {
		let state = state.clone();
		EventHandler::new(move |payload: &EventPayload| {
			let Some(reported) = payload.error().cloned() else {
				return;
			};
			if state.with(|current| current.flags_error.is_none()) {
				state.update(|current| FlagsStatus {
					flags_error: Some(reported),
					..current.clone()
				});
			}
		})
	};

	let on_recovered = {
		let state = state.clone();
		EventHandler::new(move |_| {
			if state.with(|current| current.flags_error.is_some()) {
				state.update(|current| FlagsStatus {
					flags_error: None,
					..current.clone()
				});
			}
		})
	};

	subscriptions.register(ClientEvent::Ready, on_ready);
	subscriptions.register(ClientEvent::Error, on_error);
	subscriptions.register(ClientEvent::Recovered, on_recovered);

	FlagsStatusHook {
		state,
		pending_ready,
		subscriptions,
	}
}

impl FlagsStatusHook {
	pub fn get(&self) -> FlagsStatus {
		self.state.get()
	}

	pub fn flags_ready(&self) -> bool {
		self.state.with(|s| s.flags_ready)
	}

	pub fn flags_error(&self) -> Option<FlagsError> {
		self.state.with(|s| s.flags_error.clone())
	}

	pub fn state(&self) -> &StateSlot<FlagsStatus> {
		&self.state
	}

	/// Number of client handlers this hook holds.
	pub fn handler_count(&self) -> usize {
		self.subscriptions.len()
	}
}

impl Drop for FlagsStatusHook {
	fn drop(&mut self) {
		if let Some(handle) = self.pending_ready.borrow_mut().take() {
			handle.cancel();
		}
	}
}
