//! Events pushed by the execution engine over the workflow channel.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::StateTag;

/// Tuple currently held by one worker of an operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerTuples {
  #[serde(rename = "workerID")]
  pub worker_id: String,
  pub tuple: Vec<String>,
}

/// Snapshot of the tuples an operator's workers were processing when paused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorCurrentTuples {
  #[serde(rename = "operatorID")]
  pub operator_id: String,
  #[serde(default)]
  pub tuples: Vec<WorkerTuples>,
}

/// Tuple that satisfied a breakpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointFaultedTuple {
  pub tuple: Vec<String>,
  pub id: i64,
  pub is_input: bool,
}

/// A faulted tuple paired with the actor that reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointFault {
  pub actor_path: String,
  pub faulted_tuple: BreakpointFaultedTuple,
  #[serde(default)]
  pub messages: Vec<String>,
}

/// Payload of a triggered breakpoint: ordered fault reports plus the operator on whose
/// outgoing link the breakpoint fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointTriggerInfo {
  pub report: Vec<BreakpointFault>,
  #[serde(rename = "operatorID")]
  pub operator_id: String,
}

/// Validation failure for one operator property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorPropertyError {
  pub property_path: String,
  pub message: String,
}

/// Inbound channel event. Frames are JSON objects tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
  WorkflowStateEvent {
    state: StateTag,
  },
  RecoveryStartedEvent,
  OperatorCurrentTuplesUpdateEvent(OperatorCurrentTuples),
  BreakpointTriggeredEvent(BreakpointTriggerInfo),
  WorkflowErrorEvent {
    #[serde(rename = "operatorErrors", default)]
    operator_errors: HashMap<String, OperatorPropertyError>,
    #[serde(rename = "generalErrors", default)]
    general_errors: HashMap<String, String>,
  },
  WorkflowExecutionErrorEvent {
    message: String,
  },
  /// Any event type this client does not interpret (results, stats, console output, ...).
  #[serde(other)]
  Unknown,
}

impl ServerEvent {
  pub fn state(state: StateTag) -> Self {
    ServerEvent::WorkflowStateEvent { state }
  }

  /// Wire name of the event, for logging.
  pub fn kind(&self) -> &'static str {
    match self {
      ServerEvent::WorkflowStateEvent { .. } => "WorkflowStateEvent",
      ServerEvent::RecoveryStartedEvent => "RecoveryStartedEvent",
      ServerEvent::OperatorCurrentTuplesUpdateEvent(_) => "OperatorCurrentTuplesUpdateEvent",
      ServerEvent::BreakpointTriggeredEvent(_) => "BreakpointTriggeredEvent",
      ServerEvent::WorkflowErrorEvent { .. } => "WorkflowErrorEvent",
      ServerEvent::WorkflowExecutionErrorEvent { .. } => "WorkflowExecutionErrorEvent",
      ServerEvent::Unknown => "Unknown",
    }
  }
}
