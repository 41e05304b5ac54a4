// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Single-threaded deferred task queue.
//!
//! The host drains the queue once per tick with [`Scheduler::run_pending`].
//! Tasks deferred while a tick is running land in the next tick, which is
//! what lets the status hook flip readiness one tick after the per-flag hooks
//! have resynchronised.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

struct Task {
	id: u64,
	run: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct SchedulerInner {
	next_id: u64,
	queue: VecDeque<Task>,
}

/// A FIFO of deferred closures. Cloning shares the queue.
#[derive(Clone, Default)]
pub struct Scheduler {
	inner: Rc<RefCell<SchedulerInner>>,
}

impl Scheduler {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues `task` for the next tick.
	pub fn defer(&self, task: impl FnOnce() + 'static) -> TaskHandle {
		let mut inner = self.inner.borrow_mut();
		let id = inner.next_id;
		inner.next_id += 1;
		inner.queue.push_back(Task {
			id,
			run: Box::new(task),
		});
		TaskHandle {
			id,
			scheduler: Rc::downgrade(&self.inner),
		}
	}

	/// Number of queued tasks.
	pub fn pending(&self) -> usize {
		self.inner.borrow().queue.len()
	}

	/// Runs the tasks queued before this call. Returns how many ran.
	pub fn run_pending(&self) -> usize {
		let cutoff = self.inner.borrow().next_id;
		let mut ran = 0;
		loop {
			let task = {
				let mut inner = self.inner.borrow_mut();
				match inner.queue.front() {
					Some(task) if task.id < cutoff => inner.queue.pop_front(),
					_ => None,
				}
			};
			let Some(task) = task else {
				break;
			};
			(task.run)();
			ran += 1;
		}
		ran
	}

	/// Runs ticks until the queue is empty. Returns how many tasks ran.
	pub fn run_until_idle(&self) -> usize {
		let mut total = 0;
		loop {
			let ran = self.run_pending();
			if ran == 0 {
				return total;
			}
			total += ran;
		}
	}
}

impl fmt::Debug for Scheduler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scheduler")
			.field("pending", &self.pending())
			.finish()
	}
}

/// Handle to a deferred task.
#[derive(Debug)]
pub struct TaskHandle {
	id: u64,
	scheduler: Weak<RefCell<SchedulerInner>>,
}

impl TaskHandle {
	/// Removes the task if it has not run yet. Returns true if it was removed.
	pub fn cancel(&self) -> bool {
		let Some(inner) = self.scheduler.upgrade() else {
			return false;
		};
		let mut inner = inner.borrow_mut();
		match inner.queue.iter().position(|t| t.id == self.id) {
			Some(idx) => {
				inner.queue.remove(idx);
				true
			}
			None => false,
		}
	}

	pub fn is_pending(&self) -> bool {
		let Some(inner) = self.scheduler.upgrade() else {
			return false;
		};
		let pending = inner.borrow().queue.iter().any(|t| t.id == self.id);
		pending
	}
}
