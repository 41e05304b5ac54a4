// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Lifecycle events emitted by a flags client and the handler bookkeeping
//! behind `on`/`off`.
//!
//! Handlers are identified by pointer identity. A subscriber keeps the
//! [`EventHandler`] it registered and passes the same handle back to `off`;
//! there is no way to remove a handler without it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FlagsError, Result};

/// The closed set of events a client emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientEvent {
	/// The client holds its first authoritative toggle snapshot.
	Ready,
	/// A fetch or storage operation failed.
	Error,
	/// A previously failing client is healthy again.
	Recovered,
	/// The toggle snapshot was replaced.
	Update,
}

impl ClientEvent {
	pub const ALL: [ClientEvent; 4] = [
		ClientEvent::Ready,
		ClientEvent::Error,
		ClientEvent::Recovered,
		ClientEvent::Update,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			ClientEvent::Ready => "ready",
			ClientEvent::Error => "error",
			ClientEvent::Recovered => "recovered",
			ClientEvent::Update => "update",
		}
	}
}

impl fmt::Display for ClientEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Argument passed to event handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
	None,
	Error(FlagsError),
}

impl EventPayload {
	pub fn error(&self) -> Option<&FlagsError> {
		match self {
			EventPayload::Error(err) => Some(err),
			EventPayload::None => None,
		}
	}
}

/// An opaque, cloneable callback handle. Clones compare equal to each other
/// and to nothing else.
#[derive(Clone)]
pub struct EventHandler {
	callback: Rc<dyn Fn(&EventPayload)>,
}

impl EventHandler {
	pub fn new(callback: impl Fn(&EventPayload) + 'static) -> Self {
		Self {
			callback: Rc::new(callback),
		}
	}

	pub fn call(&self, payload: &EventPayload) {
		(self.callback)(payload)
	}

	/// Returns true if both handles refer to the same callback.
	pub fn same(&self, other: &EventHandler) -> bool {
		std::ptr::addr_eq(Rc::as_ptr(&self.callback), Rc::as_ptr(&other.callback))
	}
}

impl PartialEq for EventHandler {
	fn eq(&self, other: &Self) -> bool {
		self.same(other)
	}
}

impl Eq for EventHandler {}

impl fmt::Debug for EventHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventHandler")
			.field("ptr", &Rc::as_ptr(&self.callback).cast::<()>())
			.finish()
	}
}

/// Ordered per-event handler lists.
///
/// Emission dispatches to a snapshot of the handlers taken before the first
/// call, so handlers may subscribe or unsubscribe while an event is in flight.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
	handlers: RefCell<Vec<(ClientEvent, EventHandler)>>,
}

impl HandlerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler` for `event`.
	///
	/// Registering a handle that is already present for the same event is
	/// rejected rather than replacing or duplicating it.
	pub fn on(&self, event: ClientEvent, handler: EventHandler) -> Result<()> {
		let mut handlers = self.handlers.borrow_mut();
		if handlers.iter().any(|(e, h)| *e == event && h.same(&handler)) {
			warn!(event = %event, "Rejected duplicate handler registration");
			return Err(FlagsError::HandlerAlreadyRegistered { event });
		}
		handlers.push((event, handler));
		Ok(())
	}

	/// Removes `handler` from `event`. Returns false if it was not registered.
	pub fn off(&self, event: ClientEvent, handler: &EventHandler) -> bool {
		let mut handlers = self.handlers.borrow_mut();
		match handlers
			.iter()
			.position(|(e, h)| *e == event && h.same(handler))
		{
			Some(idx) => {
				handlers.remove(idx);
				true
			}
			None => false,
		}
	}

	/// Invokes every handler registered for `event`, in registration order.
	pub fn emit(&self, event: ClientEvent, payload: &EventPayload) -> usize {
		let snapshot: Vec<EventHandler> = self
			.handlers
			.borrow()
			.iter()
			.filter(|(e, _)| *e == event)
			.map(|(_, h)| h.clone())
			.collect();

		for handler in &snapshot {
			handler.call(payload);
		}
		snapshot.len()
	}

	pub fn handler_count(&self, event: ClientEvent) -> usize {
		self
			.handlers
			.borrow()
			.iter()
			.filter(|(e, _)| *e == event)
			.count()
	}

	pub fn total_handlers(&self) -> usize {
		self.handlers.borrow().len()
	}
}
