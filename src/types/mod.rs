//! Data model shared by the compiler, the reducer and the executor.
//!
//! Wire-facing types serialize with the engine's JSON field names.

mod client_request;
mod command;
mod execution_state;
mod logical_plan;
mod server_event;
mod workflow_graph;

pub use client_request::ClientRequest;
pub use command::{Command, CommandTimeout};
pub use execution_state::{
  EXECUTION_ERROR_KEY, ExecutionState, StateFamily, StateTag, TIMEOUT_ERROR_KEY,
};
pub use logical_plan::{
  BreakpointCondition, BreakpointInfo, BreakpointRequest, LogicalLink, LogicalOperator,
  LogicalPlan, LogicalPort,
};
pub use server_event::{
  BreakpointFault, BreakpointFaultedTuple, BreakpointTriggerInfo, OperatorCurrentTuples,
  OperatorPropertyError, ServerEvent, WorkerTuples,
};
pub use workflow_graph::{
  Breakpoint, OperatorLink, OperatorPort, OperatorPredicate, PortDescription, WorkflowGraph,
};
