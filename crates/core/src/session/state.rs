//! Connection state and delegate notification.

use std::fmt;
use std::sync::Weak;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Where the session stands with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
	/// No access token yet, or the last one was rejected.
	#[default]
	NotConnected,
	/// Authenticated as the application.
	Connected,
	/// Authenticated and linked to an end user account.
	ConnectedSynchronized,
}

impl SessionState {
	pub fn as_str(self) -> &'static str {
		match self {
			SessionState::NotConnected => "not_connected",
			SessionState::Connected => "connected",
			SessionState::ConnectedSynchronized => "connected_synchronized",
		}
	}

	pub fn is_connected(self) -> bool {
		self != SessionState::NotConnected
	}
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Receives session lifecycle events.
///
/// The session holds its delegate weakly. Notifications run on a dedicated
/// task, one at a time and in transition order.
pub trait SessionDelegate: Send + Sync {
	fn on_state_changed(&self, _new: SessionState, _old: SessionState) {}
}

type Transition = (SessionState, SessionState);

/// Current state plus the queue feeding the delegate dispatcher.
pub(crate) struct StateTracker {
	state: RwLock<SessionState>,
	notifier: Option<mpsc::UnboundedSender<Transition>>,
}

impl StateTracker {
	pub(crate) fn new(runtime: &Handle, delegate: Option<Weak<dyn SessionDelegate>>) -> Self {
		let notifier = delegate.map(|delegate| {
			let (tx, rx) = mpsc::unbounded_channel();
			runtime.spawn(dispatch(delegate, rx));
			tx
		});

		Self {
			state: RwLock::new(SessionState::NotConnected),
			notifier,
		}
	}

	pub(crate) fn current(&self) -> SessionState {
		*self.state.read()
	}

	/// Moves to `new`. Returns `false` for a no-op transition.
	pub(crate) fn transition(&self, new: SessionState) -> bool {
		let mut state = self.state.write();
		let old = *state;
		if old == new {
			return false;
		}
		*state = new;

		// Enqueued under the lock so the dispatcher sees transitions in order.
		if let Some(notifier) = &self.notifier {
			let _ = notifier.send((new, old));
		}
		drop(state);

		info!(target = "imoji.session", from = %old, to = %new, "session state changed");
		true
	}
}

async fn dispatch(delegate: Weak<dyn SessionDelegate>, mut rx: mpsc::UnboundedReceiver<Transition>) {
	while let Some((new, old)) = rx.recv().await {
		match delegate.upgrade() {
			Some(delegate) => delegate.on_state_changed(new, old),
			None => debug!(target = "imoji.session", to = %new, "delegate dropped; state change not delivered"),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::time::Duration;

	use parking_lot::Mutex;

	use super::*;

	#[derive(Default)]
	struct Recorder {
		seen: Mutex<Vec<Transition>>,
	}

	impl SessionDelegate for Recorder {
		fn on_state_changed(&self, new: SessionState, old: SessionState) {
			self.seen.lock().push((new, old));
		}
	}

	#[tokio::test]
	async fn transitions_are_delivered_in_order() {
		let recorder = Arc::new(Recorder::default());
		let delegate: Arc<dyn SessionDelegate> = recorder.clone();
		let tracker = StateTracker::new(&Handle::current(), Some(Arc::downgrade(&delegate)));

		assert!(tracker.transition(SessionState::Connected));
		assert!(!tracker.transition(SessionState::Connected));
		assert!(tracker.transition(SessionState::ConnectedSynchronized));
		assert!(tracker.transition(SessionState::NotConnected));
		assert_eq!(tracker.current(), SessionState::NotConnected);

		tokio::time::sleep(Duration::from_millis(20)).await;
		assert_eq!(
			*recorder.seen.lock(),
			vec![
				(SessionState::Connected, SessionState::NotConnected),
				(SessionState::ConnectedSynchronized, SessionState::Connected),
				(SessionState::NotConnected, SessionState::ConnectedSynchronized),
			]
		);
	}

	#[tokio::test]
	async fn dropped_delegate_is_skipped() {
		let delegate: Arc<dyn SessionDelegate> = Arc::new(Recorder::default());
		let tracker = StateTracker::new(&Handle::current(), Some(Arc::downgrade(&delegate)));
		drop(delegate);

		assert!(tracker.transition(SessionState::Connected));
		tokio::time::sleep(Duration::from_millis(20)).await;
		assert_eq!(tracker.current(), SessionState::Connected);
	}
}
