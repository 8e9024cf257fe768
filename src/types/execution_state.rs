//! Execution state of the remote workflow, as seen by the client.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{BreakpointTriggerInfo, OperatorCurrentTuples};

/// Error key used for watchdog failures in [ExecutionState::Aborted].
pub const TIMEOUT_ERROR_KEY: &str = "timeout";

/// Error key used for [crate::ServerEvent::WorkflowExecutionErrorEvent].
pub const EXECUTION_ERROR_KEY: &str = "WorkflowExecutionError";

/// Closed set of execution-state tags. Serialized with the engine's wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateTag {
  Uninitialized,
  Initializing,
  Running,
  Pausing,
  Paused,
  Resuming,
  Recovering,
  BreakpointTriggered,
  Aborted,
  Completed,
}

/// Lock-coordination family of a [StateTag].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFamily {
  /// Terminal or interactive: the graph may be edited again.
  Released,
  /// A remote execution depends on the current graph shape.
  Held,
}

impl StateTag {
  pub fn family(self) -> StateFamily {
    match self {
      StateTag::Completed
      | StateTag::Aborted
      | StateTag::Uninitialized
      | StateTag::BreakpointTriggered => StateFamily::Released,
      StateTag::Paused
      | StateTag::Pausing
      | StateTag::Recovering
      | StateTag::Resuming
      | StateTag::Running
      | StateTag::Initializing => StateFamily::Held,
    }
  }
}

impl fmt::Display for StateTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

/// Authoritative execution state. Each variant carries only the payload it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum ExecutionState {
  #[default]
  Uninitialized,
  Initializing,
  Running,
  Pausing,
  /// Latest tuple snapshot per operator id.
  Paused {
    #[serde(rename = "currentTuples")]
    current_tuples: HashMap<String, OperatorCurrentTuples>,
  },
  Resuming,
  Recovering,
  BreakpointTriggered {
    breakpoint: BreakpointTriggerInfo,
  },
  /// Error key (operator id or synthetic key) to human-readable message.
  Aborted {
    #[serde(rename = "errorMessages")]
    error_messages: HashMap<String, String>,
  },
  Completed,
}

impl ExecutionState {
  pub fn tag(&self) -> StateTag {
    match self {
      ExecutionState::Uninitialized => StateTag::Uninitialized,
      ExecutionState::Initializing => StateTag::Initializing,
      ExecutionState::Running => StateTag::Running,
      ExecutionState::Pausing => StateTag::Pausing,
      ExecutionState::Paused { .. } => StateTag::Paused,
      ExecutionState::Resuming => StateTag::Resuming,
      ExecutionState::Recovering => StateTag::Recovering,
      ExecutionState::BreakpointTriggered { .. } => StateTag::BreakpointTriggered,
      ExecutionState::Aborted { .. } => StateTag::Aborted,
      ExecutionState::Completed => StateTag::Completed,
    }
  }

  /// Builds the payload-free state for `tag`. Payload-carrying tags get an empty payload,
  /// except `BreakpointTriggered` and `Aborted`, which cannot be built without one.
  #[instrument(level = "trace")]
  pub fn bare(tag: StateTag) -> Option<Self> {
    let state = match tag {
      StateTag::Uninitialized => ExecutionState::Uninitialized,
      StateTag::Initializing => ExecutionState::Initializing,
      StateTag::Running => ExecutionState::Running,
      StateTag::Pausing => ExecutionState::Pausing,
      StateTag::Paused => ExecutionState::paused(HashMap::new()),
      StateTag::Resuming => ExecutionState::Resuming,
      StateTag::Recovering => ExecutionState::Recovering,
      StateTag::Completed => ExecutionState::Completed,
      StateTag::BreakpointTriggered | StateTag::Aborted => return None,
    };
    Some(state)
  }

  pub fn paused(current_tuples: HashMap<String, OperatorCurrentTuples>) -> Self {
    ExecutionState::Paused { current_tuples }
  }

  pub fn aborted(error_messages: HashMap<String, String>) -> Self {
    ExecutionState::Aborted { error_messages }
  }

  /// `Aborted` with a single entry under [TIMEOUT_ERROR_KEY].
  pub fn timed_out(message: impl Into<String>) -> Self {
    let mut error_messages = HashMap::new();
    error_messages.insert(TIMEOUT_ERROR_KEY.to_string(), message.into());
    ExecutionState::Aborted { error_messages }
  }

  pub fn error_messages(&self) -> Option<&HashMap<String, String>> {
    match self {
      ExecutionState::Aborted { error_messages } => Some(error_messages),
      _ => None,
    }
  }

  pub fn breakpoint(&self) -> Option<&BreakpointTriggerInfo> {
    match self {
      ExecutionState::BreakpointTriggered { breakpoint } => Some(breakpoint),
      _ => None,
    }
  }

  pub fn current_tuples(&self) -> Option<&HashMap<String, OperatorCurrentTuples>> {
    match self {
      ExecutionState::Paused { current_tuples } => Some(current_tuples),
      _ => None,
    }
  }
}
