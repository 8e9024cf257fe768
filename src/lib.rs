//! # dataflow-exec
//!
//! Client-side control plane for a remotely executing data-flow job.
//!
//! ## Architecture
//!
//! - [compiler] turns the client's [WorkflowGraph] into the [LogicalPlan] the engine runs.
//! - [executor] issues lifecycle commands over the workflow channel and pumps engine
//!   events back in.
//! - [reducer] folds each event into the authoritative [ExecutionState].
//! - [state_store] owns that state, publishes transitions and drives the
//!   [lock] coordinator and the [timeout_guard] watchdog.
//!
//! Everything runs on the single task that drives [WorkflowExecutor::process_next].

pub mod codec;
pub mod compiler;
pub mod config;
#[cfg(test)]
mod config_test;
pub mod error;
pub mod executor;
pub mod lock;
pub mod reducer;
pub mod state_store;
#[cfg(test)]
mod state_store_test;
pub mod timeout_guard;
pub mod types;

pub use codec::{decode_event, encode_request};
pub use compiler::{compile_logical_plan, transform_breakpoint};
pub use config::ExecutionConfig;
pub use error::{CodecError, CompileError, ExecutionError};
pub use executor::{RemoteEnd, ResultSession, StaleResultFlag, WorkflowChannel, WorkflowExecutor};
pub use lock::{GraphEditLock, LockCoordinator};
pub use reducer::reduce;
pub use state_store::{ExecutionStateStore, StateTransition};
pub use types::{ClientRequest, ExecutionState, LogicalPlan, ServerEvent, StateTag, WorkflowGraph};
