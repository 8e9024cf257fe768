//! Fold engine events into the client's execution state.
//!
//! [reduce] is pure: it reads the current state and one event and returns the next
//! state, or `None` when the event leaves the state unchanged.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::types::{
  EXECUTION_ERROR_KEY, ExecutionState, OperatorCurrentTuples, OperatorPropertyError,
  ServerEvent, StateTag,
};

/// Returns the state that follows `current` after `event`, or `None` if unchanged.
#[instrument(level = "trace", skip(current, event), fields(current = %current.tag(), event = event.kind()))]
pub fn reduce(current: &ExecutionState, event: &ServerEvent) -> Option<ExecutionState> {
  match event {
    ServerEvent::WorkflowStateEvent { state } => reduce_state_name(current, *state),
    ServerEvent::RecoveryStartedEvent => Some(ExecutionState::Recovering),
    ServerEvent::OperatorCurrentTuplesUpdateEvent(update) => merge_tuples(current, update),
    ServerEvent::BreakpointTriggeredEvent(info) => Some(ExecutionState::BreakpointTriggered {
      breakpoint: info.clone(),
    }),
    ServerEvent::WorkflowErrorEvent {
      operator_errors,
      general_errors,
    } => Some(ExecutionState::aborted(error_messages(
      operator_errors,
      general_errors,
    ))),
    ServerEvent::WorkflowExecutionErrorEvent { message } => {
      let mut error_messages = HashMap::new();
      error_messages.insert(EXECUTION_ERROR_KEY.to_string(), message.clone());
      Some(ExecutionState::aborted(error_messages))
    }
    ServerEvent::Unknown => None,
  }
}

fn reduce_state_name(current: &ExecutionState, name: StateTag) -> Option<ExecutionState> {
  match name {
    StateTag::Paused => match current.tag() {
      StateTag::Paused | StateTag::BreakpointTriggered => None,
      _ => Some(ExecutionState::paused(HashMap::new())),
    },
    // The engine follows these with a dedicated event carrying the payload.
    StateTag::Aborted | StateTag::BreakpointTriggered => {
      debug!(state = %name, "deferring bare state until its payload event arrives");
      None
    }
    other => ExecutionState::bare(other),
  }
}

/// A fresh update for an operator replaces any stored snapshot for the same operator.
fn merge_tuples(
  current: &ExecutionState,
  update: &OperatorCurrentTuples,
) -> Option<ExecutionState> {
  let mut current_tuples = match current {
    ExecutionState::BreakpointTriggered { .. } => return None,
    ExecutionState::Paused { current_tuples } => current_tuples.clone(),
    _ => HashMap::new(),
  };
  current_tuples.insert(update.operator_id.clone(), update.clone());
  Some(ExecutionState::paused(current_tuples))
}

/// Operator errors render as `"<propertyPath>: <message>"`; general errors verbatim.
fn error_messages(
  operator_errors: &HashMap<String, OperatorPropertyError>,
  general_errors: &HashMap<String, String>,
) -> HashMap<String, String> {
  let mut messages: HashMap<String, String> = operator_errors
    .iter()
    .map(|(id, e)| (id.clone(), format!("{}: {}", e.property_path, e.message)))
    .collect();
  for (id, message) in general_errors {
    messages.insert(id.clone(), message.clone());
  }
  messages
}
