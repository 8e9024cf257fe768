//! Single-slot watchdog for commands awaiting an engine acknowledgment.
//!
//! At most one timer is armed. Arming replaces (and thereby cancels) the previous
//! timer; there is no queue. The owner polls [TimeoutGuard::expired] on its event
//! loop and turns the returned message into an `Aborted` state.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep, sleep};
use tracing::{debug, instrument};

use crate::types::StateTag;

/// An armed timer and what it is waiting for.
#[derive(Debug)]
pub struct ArmedTimeout {
  timer: Pin<Box<Sleep>>,
  message: String,
  clear_states: Vec<StateTag>,
}

impl ArmedTimeout {
  pub fn message(&self) -> &str {
    &self.message
  }

  pub fn clear_states(&self) -> &[StateTag] {
    &self.clear_states
  }

  pub fn deadline(&self) -> Instant {
    self.timer.deadline()
  }
}

#[derive(Debug, Default)]
pub struct TimeoutGuard {
  armed: Option<ArmedTimeout>,
}

impl TimeoutGuard {
  pub fn new() -> Self {
    Self::default()
  }

  /// Arms a timer firing `window` from now. Returns the timer it replaced, if any.
  ///
  /// Must be called from within a tokio runtime.
  #[instrument(level = "trace", skip(self, message))]
  pub fn arm(
    &mut self,
    window: Duration,
    message: impl Into<String>,
    clear_states: &[StateTag],
  ) -> Option<ArmedTimeout> {
    let replaced = self.armed.replace(ArmedTimeout {
      timer: Box::pin(sleep(window)),
      message: message.into(),
      clear_states: clear_states.to_vec(),
    });
    if let Some(prev) = &replaced {
      debug!(message = prev.message(), "replaced armed timeout");
    }
    replaced
  }

  /// Cancels the armed timer. Returns whether one was armed.
  pub fn disarm(&mut self) -> bool {
    self.armed.take().is_some()
  }

  pub fn is_armed(&self) -> bool {
    self.armed.is_some()
  }

  pub fn armed(&self) -> Option<&ArmedTimeout> {
    self.armed.as_ref()
  }

  /// Whether reaching `tag` acknowledges the armed timer.
  pub fn is_cleared_by(&self, tag: StateTag) -> bool {
    self
      .armed
      .as_ref()
      .is_some_and(|a| a.clear_states.contains(&tag))
  }

  /// Resolves with the failure message when the armed timer fires, disarming it.
  /// Pending forever while nothing is armed. Cancel-safe: dropping the future before
  /// it resolves leaves the timer armed.
  pub async fn expired(&mut self) -> String {
    match self.armed.as_mut() {
      Some(armed) => armed.timer.as_mut().await,
      None => pending::<()>().await,
    }
    match self.armed.take() {
      Some(armed) => armed.message,
      None => pending().await,
    }
  }
}
