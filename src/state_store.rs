//! Owner of the authoritative execution state.
//!
//! Every change goes through [ExecutionStateStore::apply], which drops value-equal
//! updates, signals the lock coordinator, disarms the watchdog when the new state
//! acknowledges it, and publishes the transition to subscribers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, instrument, warn};

use crate::config::MAX_TRANSITION_BUFFER;
use crate::lock::{LockCoordinator, apply_lock_policy};
use crate::timeout_guard::TimeoutGuard;
use crate::types::{CommandTimeout, ExecutionState};

/// A published state change.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
  pub previous: ExecutionState,
  pub current: ExecutionState,
}

pub struct ExecutionStateStore {
  current: ExecutionState,
  guard: TimeoutGuard,
  lock: Arc<dyn LockCoordinator>,
  transitions: broadcast::Sender<StateTransition>,
}

impl ExecutionStateStore {
  /// Creates a store in `Uninitialized`. `buffer` bounds each subscriber's backlog and
  /// is clamped to `1..=MAX_TRANSITION_BUFFER`.
  pub fn new(lock: Arc<dyn LockCoordinator>, buffer: usize) -> Self {
    let (transitions, _) = broadcast::channel(buffer.clamp(1, MAX_TRANSITION_BUFFER));
    Self {
      current: ExecutionState::Uninitialized,
      guard: TimeoutGuard::new(),
      lock,
      transitions,
    }
  }

  pub fn get(&self) -> &ExecutionState {
    &self.current
  }

  pub fn subscribe(&self) -> broadcast::Receiver<StateTransition> {
    self.transitions.subscribe()
  }

  /// Transitions as a stream. Lagging subscribers observe `Err(Lagged)` items.
  pub fn transitions(&self) -> BroadcastStream<StateTransition> {
    BroadcastStream::new(self.subscribe())
  }

  /// Moves to `next`. Returns `false` (and does nothing) if `next` equals the current state.
  #[instrument(level = "trace", skip(self, next), fields(next = %next.tag()))]
  pub fn apply(&mut self, next: ExecutionState) -> bool {
    if next == self.current {
      return false;
    }
    apply_lock_policy(self.lock.as_ref(), &next);
    if self.guard.is_cleared_by(next.tag()) {
      self.guard.disarm();
    }
    let previous = std::mem::replace(&mut self.current, next);
    info!(previous = %previous.tag(), current = %self.current.tag(), "execution state changed");
    // No subscribers is fine.
    let _ = self.transitions.send(StateTransition {
      previous,
      current: self.current.clone(),
    });
    true
  }

  /// Forces `Uninitialized` when the client abandons the current job. Cancels any
  /// pending watchdog; publishes nothing.
  pub fn reset(&mut self) {
    self.guard.disarm();
    self.current = ExecutionState::Uninitialized;
  }

  /// Arms the watchdog for a command, replacing any armed one.
  pub fn arm_timeout(&mut self, window: Duration, timeout: CommandTimeout) {
    self.guard.arm(window, timeout.message, timeout.clear_states);
  }

  pub fn timeout_guard(&self) -> &TimeoutGuard {
    &self.guard
  }

  /// Waits for the armed watchdog and applies its `Aborted` state. Pending while disarmed.
  pub async fn run_timeout(&mut self) -> bool {
    let message = self.guard.expired().await;
    warn!(message = %message, "command timed out waiting for engine");
    self.apply(ExecutionState::timed_out(message))
  }
}
