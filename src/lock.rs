//! Graph edit-lock coordination driven by execution-state families.
//!
//! While a remote execution depends on the current graph shape (the `Held` family),
//! the editor must neither listen for lock grants nor allow modification. Once the
//! execution is terminal or interactive (`Released`), lock listening resumes and
//! modification is re-enabled if this client holds the lock.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, instrument};

use crate::types::{ExecutionState, StateFamily};

/// External collaborator owning the editor's lock and modification switch.
pub trait LockCoordinator: Send + Sync {
  /// Starts or stops listening for lock-grant signals.
  fn set_lock_listening(&self, listening: bool);
  /// Whether the shared-editing lock is currently granted to this client.
  fn is_lock_granted(&self) -> bool;
  fn enable_modification(&self);
  fn disable_modification(&self);
}

/// Signals `lock` according to the family of `state`.
#[instrument(level = "trace", skip(lock, state), fields(state = %state.tag()))]
pub fn apply_lock_policy(lock: &dyn LockCoordinator, state: &ExecutionState) {
  match state.tag().family() {
    StateFamily::Released => {
      lock.set_lock_listening(true);
      if lock.is_lock_granted() {
        lock.enable_modification();
      }
      debug!("graph edit lock released");
    }
    StateFamily::Held => {
      lock.set_lock_listening(false);
      lock.disable_modification();
      debug!("graph edit lock held");
    }
  }
}

/// In-memory [LockCoordinator] for single-user editors and tests.
#[derive(Debug)]
pub struct GraphEditLock {
  listening: AtomicBool,
  granted: AtomicBool,
  modifiable: AtomicBool,
}

impl Default for GraphEditLock {
  fn default() -> Self {
    Self::new(true)
  }
}

impl GraphEditLock {
  /// A lock that starts listening and modifiable; `granted` is the initial grant.
  pub fn new(granted: bool) -> Self {
    Self {
      listening: AtomicBool::new(true),
      granted: AtomicBool::new(granted),
      modifiable: AtomicBool::new(granted),
    }
  }

  /// Records a grant or revocation from the lock-grant signal source.
  /// Ignored while not listening.
  pub fn grant(&self, granted: bool) {
    if self.is_listening() {
      self.granted.store(granted, Ordering::SeqCst);
      self.modifiable.store(granted, Ordering::SeqCst);
    }
  }

  pub fn is_listening(&self) -> bool {
    self.listening.load(Ordering::SeqCst)
  }

  pub fn is_modifiable(&self) -> bool {
    self.modifiable.load(Ordering::SeqCst)
  }
}

impl LockCoordinator for GraphEditLock {
  fn set_lock_listening(&self, listening: bool) {
    self.listening.store(listening, Ordering::SeqCst);
  }

  fn is_lock_granted(&self) -> bool {
    self.granted.load(Ordering::SeqCst)
  }

  fn enable_modification(&self) {
    self.modifiable.store(true, Ordering::SeqCst);
  }

  fn disable_modification(&self) {
    self.modifiable.store(false, Ordering::SeqCst);
  }
}
