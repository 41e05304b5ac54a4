// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reactive state slots and last-value holders.
//!
//! [`StateSlot<T>`] is the unit of re-render: every `set`/`update` is a
//! commit, bumps [`StateSlot::commits`] and notifies subscribers (the host's
//! re-render trigger). Deciding *whether* to commit is the caller's job; the
//! accessor hooks compare against a [`Latest<T>`] before calling `set`.
//!
//! Subscribers are held weakly and pruned lazily; dropping the returned
//! [`Subscription`] unsubscribes. Subscribers run with no borrow held, so a
//! subscriber may `set` its own slot (re-entering notification). Calling
//! `set` inside a `with` closure on the same slot panics.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

struct SlotInner<T> {
	value: T,
	commits: u64,
	subscribers: Vec<CallbackWeak<T>>,
}

/// A shared, commit-counted value with change notification.
///
/// Cloning a `StateSlot` creates another handle to the same value.
pub struct StateSlot<T> {
	inner: Rc<RefCell<SlotInner<T>>>,
}

impl<T> Clone for StateSlot<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for StateSlot<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.inner.borrow();
		f.debug_struct("StateSlot")
			.field("value", &inner.value)
			.field("commits", &inner.commits)
			.field("subscriber_count", &inner.subscribers.len())
			.finish()
	}
}

impl<T: Clone + 'static> StateSlot<T> {
	pub fn new(value: T) -> Self {
		Self {
			inner: Rc::new(RefCell::new(SlotInner {
				value,
				commits: 0,
				subscribers: Vec::new(),
			})),
		}
	}

	pub fn get(&self) -> T {
		self.inner.borrow().value.clone()
	}

	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.inner.borrow().value)
	}

	/// Commits `value` and notifies subscribers.
	pub fn set(&self, value: T) {
		{
			let mut inner = self.inner.borrow_mut();
			inner.value = value;
			inner.commits += 1;
		}
		self.notify();
	}

	/// Commits the value computed from the current one.
	///
	/// `f` sees the committed value at call time, not a value captured when
	/// the calling closure was created.
	pub fn update(&self, f: impl FnOnce(&T) -> T) {
		let next = {
			let inner = self.inner.borrow();
			f(&inner.value)
		};
		self.set(next);
	}

	/// Number of commits since creation.
	pub fn commits(&self) -> u64 {
		self.inner.borrow().commits
	}

	/// Calls `callback` with the new value after every commit.
	pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
		let strong: CallbackRc<T> = Rc::new(callback);
		self
			.inner
			.borrow_mut()
			.subscribers
			.push(Rc::downgrade(&strong));
		Subscription {
			_guard: Box::new(strong),
		}
	}

	/// Registered subscribers, including dropped ones not yet pruned.
	pub fn subscriber_count(&self) -> usize {
		self.inner.borrow().subscribers.len()
	}

	fn notify(&self) {
		let callbacks: Vec<CallbackRc<T>> = {
			let mut inner = self.inner.borrow_mut();
			inner.subscribers.retain(|w| w.strong_count() > 0);
			inner.subscribers.iter().filter_map(Weak::upgrade).collect()
		};
		if callbacks.is_empty() {
			return;
		}

		let value = self.get();
		for cb in &callbacks {
			cb(&value);
		}
	}
}

/// RAII guard for a [`StateSlot`] subscriber. Dropping it unsubscribes.
pub struct Subscription {
	_guard: Box<dyn std::any::Any>,
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").finish_non_exhaustive()
	}
}

/// The last value an accessor committed.
///
/// Event handlers compare against this instead of the state slot, and only
/// the commit path writes it.
pub struct Latest<T> {
	value: Rc<RefCell<T>>,
}

impl<T> Clone for Latest<T> {
	fn clone(&self) -> Self {
		Self {
			value: Rc::clone(&self.value),
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for Latest<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Latest").field(&self.value.borrow()).finish()
	}
}

impl<T: Clone> Latest<T> {
	pub fn new(value: T) -> Self {
		Self {
			value: Rc::new(RefCell::new(value)),
		}
	}

	pub fn get(&self) -> T {
		self.value.borrow().clone()
	}

	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.value.borrow())
	}

	pub fn replace(&self, value: T) -> T {
		self.value.replace(value)
	}
}
