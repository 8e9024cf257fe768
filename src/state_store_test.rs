//! Tests for `ExecutionStateStore`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::StreamExt;
use proptest::prelude::*;
use tokio::sync::broadcast::error::TryRecvError;

use crate::lock::{GraphEditLock, LockCoordinator};
use crate::state_store::{ExecutionStateStore, StateTransition};
use crate::types::{Command, ExecutionState, StateTag};

const WINDOW: Duration = Duration::from_millis(3000);

fn store() -> (ExecutionStateStore, Arc<GraphEditLock>) {
  let lock = Arc::new(GraphEditLock::new(true));
  (ExecutionStateStore::new(lock.clone(), 16), lock)
}

fn aborted(key: &str, msg: &str) -> ExecutionState {
  let mut m = HashMap::new();
  m.insert(key.to_string(), msg.to_string());
  ExecutionState::aborted(m)
}

#[test]
fn starts_uninitialized() {
  let (s, _) = store();
  assert_eq!(s.get(), &ExecutionState::Uninitialized);
}

#[test]
fn apply_broadcasts_previous_and_current() {
  let (mut s, _) = store();
  let mut rx = s.subscribe();
  assert!(s.apply(ExecutionState::Initializing));
  assert_eq!(
    rx.try_recv().unwrap(),
    StateTransition {
      previous: ExecutionState::Uninitialized,
      current: ExecutionState::Initializing,
    }
  );
}

#[test]
fn identical_aborted_applied_twice_broadcasts_once() {
  let (mut s, _) = store();
  let mut rx = s.subscribe();
  assert!(s.apply(aborted("op1", "boom")));
  assert!(!s.apply(aborted("op1", "boom")));
  assert!(rx.try_recv().is_ok());
  assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
}

/// Lock coordinator that counts every call made on it.
#[derive(Default)]
struct CountingLock {
  calls: AtomicUsize,
}

impl CountingLock {
  fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  fn hit(&self) {
    self.calls.fetch_add(1, Ordering::SeqCst);
  }
}

impl LockCoordinator for CountingLock {
  fn set_lock_listening(&self, _listening: bool) {
    self.hit();
  }

  fn is_lock_granted(&self) -> bool {
    self.hit();
    true
  }

  fn enable_modification(&self) {
    self.hit();
  }

  fn disable_modification(&self) {
    self.hit();
  }
}

#[test]
fn value_equal_apply_does_not_touch_lock() {
  let lock = Arc::new(CountingLock::default());
  let mut s = ExecutionStateStore::new(lock.clone(), 16);
  assert!(s.apply(aborted("op1", "boom")));
  let after_first = lock.calls();
  assert!(after_first > 0);
  assert!(!s.apply(aborted("op1", "boom")));
  assert_eq!(lock.calls(), after_first);
}

#[tokio::test(start_paused = true)]
async fn value_equal_apply_keeps_timeout_armed() {
  let (mut s, _) = store();
  s.apply(ExecutionState::Running);
  s.arm_timeout(WINDOW, Command::Pause.timeout().unwrap());
  assert!(!s.apply(ExecutionState::Running));
  assert!(s.timeout_guard().is_armed());
}

#[test]
fn oversized_buffer_is_clamped() {
  let mut s = ExecutionStateStore::new(Arc::new(GraphEditLock::default()), usize::MAX);
  let mut rx = s.subscribe();
  assert!(s.apply(ExecutionState::Running));
  assert!(rx.try_recv().is_ok());
}

#[test]
fn apply_without_subscribers_still_transitions() {
  let (mut s, _) = store();
  assert!(s.apply(ExecutionState::Running));
  assert_eq!(s.get().tag(), StateTag::Running);
}

#[test]
fn apply_drives_lock_policy() {
  let (mut s, lock) = store();
  s.apply(ExecutionState::Running);
  assert!(!lock.is_modifiable());
  s.apply(ExecutionState::Completed);
  assert!(lock.is_modifiable());
}

#[test]
fn reset_forces_uninitialized_silently() {
  let (mut s, _) = store();
  s.apply(ExecutionState::Completed);
  let mut rx = s.subscribe();
  s.reset();
  assert_eq!(s.get(), &ExecutionState::Uninitialized);
  assert_eq!(rx.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[tokio::test(start_paused = true)]
async fn clearing_state_disarms_timeout() {
  let (mut s, _) = store();
  s.arm_timeout(WINDOW, Command::Pause.timeout().unwrap());
  s.apply(ExecutionState::Pausing);
  assert!(s.timeout_guard().is_armed());
  s.apply(ExecutionState::paused(HashMap::new()));
  assert!(!s.timeout_guard().is_armed());
}

#[tokio::test(start_paused = true)]
async fn unacknowledged_timeout_aborts() {
  let (mut s, _) = store();
  let mut rx = s.subscribe();
  s.arm_timeout(WINDOW, Command::Resume.timeout().unwrap());
  assert!(s.run_timeout().await);
  assert_eq!(s.get(), &aborted("timeout", "resume operation timeout"));
  assert_eq!(rx.recv().await.unwrap().current, *s.get());
}

#[tokio::test(start_paused = true)]
async fn reset_cancels_pending_timeout() {
  let (mut s, _) = store();
  s.arm_timeout(WINDOW, Command::Execute.timeout().unwrap());
  s.reset();
  let r = tokio::time::timeout(WINDOW * 2, s.run_timeout()).await;
  assert!(r.is_err());
  assert_eq!(s.get(), &ExecutionState::Uninitialized);
}

#[tokio::test]
async fn transitions_stream_yields_changes() {
  let (mut s, _) = store();
  let mut stream = s.transitions();
  s.apply(ExecutionState::Initializing);
  s.apply(ExecutionState::Running);
  let first = stream.next().await.unwrap().unwrap();
  let second = stream.next().await.unwrap().unwrap();
  assert_eq!(first.current, ExecutionState::Initializing);
  assert_eq!(second.previous, ExecutionState::Initializing);
  assert_eq!(second.current, ExecutionState::Running);
}

fn arb_state() -> impl Strategy<Value = ExecutionState> {
  prop_oneof![
    Just(ExecutionState::Initializing),
    Just(ExecutionState::Running),
    Just(ExecutionState::Completed),
    "[a-b]{1}".prop_map(|m| aborted("k", &m)),
  ]
}

proptest! {
  #[test]
  fn broadcast_count_equals_value_changes(states in prop::collection::vec(arb_state(), 0..20)) {
    let mut s = ExecutionStateStore::new(Arc::new(GraphEditLock::default()), 64);
    let mut rx = s.subscribe();
    let mut expected = 0;
    let mut last = ExecutionState::Uninitialized;
    for st in states {
      if st != last {
        expected += 1;
      }
      last = st.clone();
      s.apply(st);
    }
    let mut received = 0;
    while rx.try_recv().is_ok() {
      received += 1;
    }
    prop_assert_eq!(received, expected);
  }
}
