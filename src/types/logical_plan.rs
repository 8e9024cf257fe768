//! Wire-level logical plan sent to the execution engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Operator as the engine sees it: its properties plus id and type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalOperator {
  #[serde(rename = "operatorID")]
  pub operator_id: String,
  #[serde(rename = "operatorType")]
  pub operator_type: String,
  /// Never contains `operatorID` or `operatorType`; those are the fields above.
  #[serde(flatten)]
  pub properties: Map<String, Value>,
}

/// One end of a [LogicalLink].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalPort {
  #[serde(rename = "operatorID")]
  pub operator_id: String,
  pub port_ordinal: usize,
  pub port_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalLink {
  pub origin: LogicalPort,
  pub destination: LogicalPort,
}

/// Comparison applied by a condition breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakpointCondition {
  #[serde(rename = "=")]
  Equal,
  #[serde(rename = ">")]
  Greater,
  #[serde(rename = ">=")]
  GreaterEqual,
  #[serde(rename = "<")]
  Less,
  #[serde(rename = "<=")]
  LessEqual,
  #[serde(rename = "!=")]
  NotEqual,
  #[serde(rename = "contains")]
  Contains,
  #[serde(rename = "does not contain")]
  DoesNotContain,
}

/// Typed breakpoint, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BreakpointRequest {
  ConditionBreakpoint {
    column: u32,
    condition: BreakpointCondition,
    value: String,
  },
  CountBreakpoint {
    count: u64,
  },
}

/// A breakpoint bound to the source operator of the link it was set on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointInfo {
  #[serde(rename = "operatorID")]
  pub operator_id: String,
  pub breakpoint: BreakpointRequest,
}

/// The enabled subset of a workflow graph, plus breakpoints and cache hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalPlan {
  pub operators: Vec<LogicalOperator>,
  pub links: Vec<LogicalLink>,
  pub breakpoints: Vec<BreakpointInfo>,
  pub cached_operator_ids: Vec<String>,
}
