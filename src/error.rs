//! Typed errors.
//!
//! - `CompileError`: the workflow graph cannot be turned into a logical plan
//! - `ExecutionError`: a command could not be issued
//! - `CodecError`: a channel frame could not be encoded or decoded
//!
//! Engine-reported failures and watchdog timeouts are not errors here; they surface
//! as [crate::ExecutionState::Aborted].

use thiserror::Error;

use crate::types::{Command, StateTag};

/// Errors raised while compiling a workflow graph.
#[derive(Debug, Error)]
pub enum CompileError {
  #[error("unhandled breakpoint data on link {link_id}: neither a condition nor a count breakpoint")]
  UnrecognizedBreakpoint { link_id: String },

  #[error("unhandled breakpoint data on link {link_id}: both condition and count are set")]
  AmbiguousBreakpoint { link_id: String },

  #[error("malformed breakpoint on link {link_id}: {source}")]
  MalformedBreakpoint {
    link_id: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("link {0} not found in workflow graph")]
  UnknownLink(String),

  #[error("operator {0} not found in workflow graph")]
  UnknownOperator(String),

  #[error("port {port_id} is not declared on operator {operator_id}")]
  UnknownPort {
    operator_id: String,
    port_id: String,
  },
}

/// Errors raised synchronously by a command.
#[derive(Debug, Error)]
pub enum ExecutionError {
  /// The command's state precondition does not hold. This is a caller bug.
  #[error("cannot {command}, the current execution state is {state}")]
  InvalidState { command: Command, state: StateTag },

  #[error(transparent)]
  Compile(#[from] CompileError),

  #[error("workflow channel closed")]
  ChannelClosed,
}

/// Errors from encoding or decoding channel frames.
#[derive(Debug, Error)]
pub enum CodecError {
  #[error("failed to encode {kind}: {source}")]
  Encode {
    kind: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to decode server event: {0}")]
  Decode(#[source] serde_json::Error),
}
