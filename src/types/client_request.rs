//! Requests sent to the execution engine over the workflow channel.

use serde::{Deserialize, Serialize};

use super::{BreakpointFaultedTuple, BreakpointInfo, LogicalOperator, LogicalPlan};

/// Outbound channel message. Frames are JSON objects tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
  WorkflowExecuteRequest(LogicalPlan),
  WorkflowPauseRequest,
  WorkflowResumeRequest,
  WorkflowKillRequest,
  AddBreakpointRequest(BreakpointInfo),
  SkipTupleRequest {
    #[serde(rename = "faultedTuple")]
    faulted_tuple: BreakpointFaultedTuple,
    #[serde(rename = "actorPath")]
    actor_path: String,
  },
  RetryRequest,
  ModifyLogicRequest {
    operator: LogicalOperator,
  },
}

impl ClientRequest {
  /// Wire name of the request, for logging.
  pub fn kind(&self) -> &'static str {
    match self {
      ClientRequest::WorkflowExecuteRequest(_) => "WorkflowExecuteRequest",
      ClientRequest::WorkflowPauseRequest => "WorkflowPauseRequest",
      ClientRequest::WorkflowResumeRequest => "WorkflowResumeRequest",
      ClientRequest::WorkflowKillRequest => "WorkflowKillRequest",
      ClientRequest::AddBreakpointRequest(_) => "AddBreakpointRequest",
      ClientRequest::SkipTupleRequest { .. } => "SkipTupleRequest",
      ClientRequest::RetryRequest => "RetryRequest",
      ClientRequest::ModifyLogicRequest { .. } => "ModifyLogicRequest",
    }
  }
}
