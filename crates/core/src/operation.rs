//! Cancellable handles for in-flight session operations.
//!
//! Every asynchronous session method returns a [`PendingOperation`]. The
//! operation owns the spawned task and gates every callback delivery, so a
//! cancelled operation is guaranteed to stay silent.
//!
//! # State machine
//!
//! ```text
//! Running --deliver--> Delivering --done--> Running
//!    |                     |
//!    |                  cancel (delivery completes, then)
//!    v                     v
//! Cancelled <---------- Cancelled
//!
//! Running/Delivering --final delivery--> Finished
//! ```
//!
//! Once the final delivery has started, cancellation loses: `cancel()` returns
//! `false` and the outcome is [`OperationOutcome::Completed`]. No lock is held
//! while a callback runs, so callbacks may cancel their own operation or start
//! new ones.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::trace;

/// Lifecycle of a [`PendingOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
	/// Work is in progress and callbacks may still fire.
	Running,
	/// A callback is executing right now.
	Delivering,
	/// The final callback was delivered.
	Finished,
	/// Cancelled by the caller or by session teardown. No further callbacks.
	Cancelled,
}

/// How a settled operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
	/// The final callback was delivered.
	Completed,
	Cancelled,
}

struct Status {
	state: OperationState,
	cancel_requested: bool,
	final_delivery: bool,
	task: Option<AbortHandle>,
}

struct OperationInner {
	id: u32,
	name: &'static str,
	status: Mutex<Status>,
	settled: watch::Sender<Option<OperationOutcome>>,
}

/// Handle to one in-flight session operation.
///
/// Cloning shares the same operation. Dropping the handle does not cancel it.
#[derive(Clone)]
pub struct PendingOperation {
	inner: Arc<OperationInner>,
}

impl PendingOperation {
	fn new(id: u32, name: &'static str) -> Self {
		Self {
			inner: Arc::new(OperationInner {
				id,
				name,
				status: Mutex::new(Status {
					state: OperationState::Running,
					cancel_requested: false,
					final_delivery: false,
					task: None,
				}),
				settled: watch::Sender::new(None),
			}),
		}
	}

	pub fn id(&self) -> u32 {
		self.inner.id
	}

	/// Name of the session method that started this operation.
	pub fn name(&self) -> &'static str {
		self.inner.name
	}

	pub fn state(&self) -> OperationState {
		self.inner.status.lock().state
	}

	/// True once [`cancel`](Self::cancel) has taken effect or been requested.
	pub fn is_cancelled(&self) -> bool {
		let status = self.inner.status.lock();
		status.state == OperationState::Cancelled || status.cancel_requested
	}

	pub fn is_finished(&self) -> bool {
		self.state() == OperationState::Finished
	}

	/// Waits until the operation has either delivered its final callback or
	/// been cancelled.
	pub async fn finished(&self) -> OperationOutcome {
		let mut settled = self.inner.settled.subscribe();
		match settled.wait_for(Option::is_some).await {
			Ok(outcome) => (*outcome).unwrap_or(OperationOutcome::Cancelled),
			// The sender lives as long as `self`.
			Err(_) => OperationOutcome::Cancelled,
		}
	}

	/// Cancels the operation.
	///
	/// Returns `true` if the operation was still live. No callback starts
	/// after this returns; a per-item callback already executing on another
	/// task runs to completion. Returns `false` if the operation had already
	/// settled or its final callback is already running.
	pub fn cancel(&self) -> bool {
		let mut status = self.inner.status.lock();
		match status.state {
			OperationState::Running => {
				status.state = OperationState::Cancelled;
				self.inner.settled.send_replace(Some(OperationOutcome::Cancelled));
			}
			OperationState::Delivering if !status.cancel_requested && !status.final_delivery => {
				status.cancel_requested = true;
			}
			_ => return false,
		}

		if let Some(task) = status.task.take() {
			task.abort();
		}
		trace!(target = "imoji.session", id = self.inner.id, operation = self.inner.name, "operation cancelled");
		true
	}

	/// Runs `callback` unless the operation was cancelled. Returns whether it ran.
	pub(crate) fn deliver(&self, callback: impl FnOnce()) -> bool {
		self.run_delivery(callback, false)
	}

	/// Runs the final `callback` and marks the operation finished.
	pub(crate) fn complete(&self, callback: impl FnOnce()) -> bool {
		self.run_delivery(callback, true)
	}

	fn run_delivery(&self, callback: impl FnOnce(), last: bool) -> bool {
		{
			let mut status = self.inner.status.lock();
			if status.state != OperationState::Running || status.cancel_requested {
				return false;
			}
			status.state = OperationState::Delivering;
			status.final_delivery = last;
		}

		callback();

		let mut status = self.inner.status.lock();
		let outcome = if last {
			status.state = OperationState::Finished;
			status.task = None;
			Some(OperationOutcome::Completed)
		} else if status.cancel_requested {
			status.state = OperationState::Cancelled;
			Some(OperationOutcome::Cancelled)
		} else {
			status.state = OperationState::Running;
			None
		};
		if outcome.is_some() {
			self.inner.settled.send_replace(outcome);
		}
		true
	}

	fn attach(&self, task: AbortHandle) {
		let mut status = self.inner.status.lock();
		match status.state {
			OperationState::Cancelled => task.abort(),
			OperationState::Finished => {}
			_ if status.cancel_requested => task.abort(),
			_ => status.task = Some(task),
		}
	}

	fn is_live(&self) -> bool {
		matches!(self.state(), OperationState::Running | OperationState::Delivering)
	}
}

impl fmt::Debug for PendingOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PendingOperation")
			.field("id", &self.inner.id)
			.field("name", &self.inner.name)
			.field("state", &self.state())
			.finish()
	}
}

/// Tracks the live operations of one session.
pub(crate) struct OperationRegistry {
	next_id: AtomicU32,
	live: Mutex<HashMap<u32, Weak<OperationInner>>>,
}

impl OperationRegistry {
	pub(crate) fn new() -> Self {
		Self {
			next_id: AtomicU32::new(1),
			live: Mutex::new(HashMap::new()),
		}
	}

	pub(crate) fn create(&self, name: &'static str) -> PendingOperation {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let operation = PendingOperation::new(id, name);

		let mut live = self.live.lock();
		live.retain(|_, weak| weak.upgrade().is_some_and(|inner| PendingOperation { inner }.is_live()));
		live.insert(id, Arc::downgrade(&operation.inner));
		operation
	}

	/// Runs `work` on `runtime`, tied to `operation` so cancelling aborts it.
	pub(crate) fn spawn<F>(&self, runtime: &Handle, operation: &PendingOperation, work: F)
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let task = runtime.spawn(work);
		operation.attach(task.abort_handle());
	}

	/// Number of operations still running.
	pub(crate) fn active(&self) -> usize {
		self.live
			.lock()
			.values()
			.filter_map(Weak::upgrade)
			.filter(|inner| PendingOperation { inner: Arc::clone(inner) }.is_live())
			.count()
	}

	/// Cancels every live operation and returns how many were cancelled.
	pub(crate) fn cancel_all(&self) -> usize {
		let operations: Vec<PendingOperation> = self
			.live
			.lock()
			.drain()
			.filter_map(|(_, weak)| weak.upgrade())
			.map(|inner| PendingOperation { inner })
			.collect();
		operations.iter().filter(|operation| operation.cancel()).count()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;
	use std::time::Duration;

	use super::*;

	#[test]
	fn cancel_before_delivery_suppresses_callbacks() {
		let registry = OperationRegistry::new();
		let operation = registry.create("test");

		assert!(operation.cancel());
		assert!(!operation.deliver(|| panic!("delivered after cancel")));
		assert!(!operation.complete(|| panic!("completed after cancel")));
		assert_eq!(operation.state(), OperationState::Cancelled);
	}

	#[test]
	fn cancel_is_false_once_settled() {
		let registry = OperationRegistry::new();
		let operation = registry.create("test");
		assert!(operation.complete(|| {}));
		assert!(operation.is_finished());
		assert!(!operation.cancel());

		let other = registry.create("test");
		assert!(other.cancel());
		assert!(!other.cancel());
	}

	#[test]
	fn cancel_from_inside_a_callback_stops_later_deliveries() {
		let registry = OperationRegistry::new();
		let operation = registry.create("test");
		let delivered = AtomicUsize::new(0);

		let handle = operation.clone();
		assert!(operation.deliver(|| {
			delivered.fetch_add(1, Ordering::SeqCst);
			assert!(handle.cancel());
		}));
		assert!(!operation.deliver(|| {
			delivered.fetch_add(1, Ordering::SeqCst);
		}));

		assert_eq!(delivered.load(Ordering::SeqCst), 1);
		assert_eq!(operation.state(), OperationState::Cancelled);
	}

	#[test]
	fn final_delivery_wins_over_cancel() {
		let registry = OperationRegistry::new();
		let operation = registry.create("test");

		let handle = operation.clone();
		assert!(operation.complete(|| assert!(!handle.cancel())));
		assert!(operation.is_finished());
		assert!(!operation.is_cancelled());
	}

	#[tokio::test]
	async fn finished_reports_the_outcome() {
		let registry = OperationRegistry::new();
		let completed = registry.create("test");
		let cancelled = registry.create("test");

		completed.complete(|| {});
		cancelled.cancel();

		assert_eq!(completed.finished().await, OperationOutcome::Completed);
		assert_eq!(cancelled.finished().await, OperationOutcome::Cancelled);
	}

	#[test]
	fn cancel_all_skips_settled_operations() {
		let registry = OperationRegistry::new();
		let done = registry.create("done");
		done.complete(|| {});
		let running = registry.create("running");
		let _also_running = registry.create("running");

		assert_eq!(registry.active(), 2);
		assert_eq!(registry.cancel_all(), 2);
		assert!(running.is_cancelled());
		assert_eq!(registry.active(), 0);
	}

	#[tokio::test]
	async fn cancel_aborts_the_spawned_task() {
		let registry = OperationRegistry::new();
		let operation = registry.create("sleep");
		let reached = Arc::new(AtomicUsize::new(0));

		let counter = Arc::clone(&reached);
		registry.spawn(&Handle::current(), &operation, async move {
			tokio::time::sleep(Duration::from_millis(50)).await;
			counter.fetch_add(1, Ordering::SeqCst);
		});

		assert!(operation.cancel());
		tokio::time::sleep(Duration::from_millis(100)).await;
		assert_eq!(reached.load(Ordering::SeqCst), 0);
	}
}
