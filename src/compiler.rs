//! Compile a workflow graph snapshot to the engine's logical plan.
//!
//! - Only enabled operators and enabled links are included.
//! - Link ends are resolved to the port's ordinal and display name on its operator.
//! - Breakpoints are bound to the source operator of the link they are set on.
//! - Cached operator ids exclude disabled operators.

use serde_json::Value;
use tracing::{info, instrument};

use crate::error::CompileError;
use crate::types::{
  Breakpoint, BreakpointInfo, BreakpointRequest, LogicalLink, LogicalOperator, LogicalPlan,
  LogicalPort, OperatorPort, OperatorPredicate, WorkflowGraph,
};

/// Which side of an operator a link end attaches to.
#[derive(Debug, Clone, Copy)]
enum PortSide {
  Input,
  Output,
}

/// Builds the engine-facing operator: properties plus id and type.
pub fn logical_operator(op: &OperatorPredicate) -> LogicalOperator {
  let mut properties = op.operator_properties.clone();
  properties.remove("operatorID");
  properties.remove("operatorType");
  LogicalOperator {
    operator_id: op.operator_id.clone(),
    operator_type: op.operator_type.clone(),
    properties,
  }
}

#[instrument(level = "trace", skip(graph))]
fn resolve_port(
  graph: &WorkflowGraph,
  port: &OperatorPort,
  side: PortSide,
) -> Result<LogicalPort, CompileError> {
  let op = graph
    .operator(&port.operator_id)
    .ok_or_else(|| CompileError::UnknownOperator(port.operator_id.clone()))?;
  let (ports, ordinal) = match side {
    PortSide::Input => (&op.input_ports, op.input_port_ordinal(&port.port_id)),
    PortSide::Output => (&op.output_ports, op.output_port_ordinal(&port.port_id)),
  };
  let ordinal = ordinal.ok_or_else(|| CompileError::UnknownPort {
    operator_id: port.operator_id.clone(),
    port_id: port.port_id.clone(),
  })?;
  Ok(LogicalPort {
    operator_id: port.operator_id.clone(),
    port_ordinal: ordinal,
    port_name: ports[ordinal].display_name.clone().unwrap_or_default(),
  })
}

/// Derives the typed breakpoint from the presence of `condition` or `count`.
#[instrument(level = "trace")]
fn typed_breakpoint(link_id: &str, breakpoint: &Breakpoint) -> Result<BreakpointRequest, CompileError> {
  let tag = match (breakpoint.has_field("condition"), breakpoint.has_field("count")) {
    (true, false) => "ConditionBreakpoint",
    (false, true) => "CountBreakpoint",
    (true, true) => {
      return Err(CompileError::AmbiguousBreakpoint {
        link_id: link_id.to_string(),
      });
    }
    (false, false) => {
      return Err(CompileError::UnrecognizedBreakpoint {
        link_id: link_id.to_string(),
      });
    }
  };
  let mut fields = breakpoint.0.clone();
  fields.insert("type".to_string(), Value::from(tag));
  serde_json::from_value(Value::Object(fields)).map_err(|source| {
    CompileError::MalformedBreakpoint {
      link_id: link_id.to_string(),
      source,
    }
  })
}

/// Binds `breakpoint` (set on `link_id`) to the link's source operator.
#[instrument(level = "trace", skip(graph, breakpoint))]
pub fn transform_breakpoint(
  graph: &WorkflowGraph,
  link_id: &str,
  breakpoint: &Breakpoint,
) -> Result<BreakpointInfo, CompileError> {
  let link = graph
    .link(link_id)
    .ok_or_else(|| CompileError::UnknownLink(link_id.to_string()))?;
  Ok(BreakpointInfo {
    operator_id: link.source.operator_id.clone(),
    breakpoint: typed_breakpoint(link_id, breakpoint)?,
  })
}

/// Compiles a workflow graph snapshot to a [LogicalPlan].
///
/// Deterministic: operators, links and breakpoints follow the graph's declaration order.
/// Fails on malformed breakpoints and on links that reference undeclared operators or ports.
#[instrument(level = "trace", skip(graph))]
pub fn compile_logical_plan(graph: &WorkflowGraph) -> Result<LogicalPlan, CompileError> {
  info!("compiling workflow graph to logical plan");

  let operators: Vec<LogicalOperator> = graph.enabled_operators().map(logical_operator).collect();

  let links = graph
    .enabled_links()
    .map(|link| {
      Ok(LogicalLink {
        origin: resolve_port(graph, &link.source, PortSide::Output)?,
        destination: resolve_port(graph, &link.target, PortSide::Input)?,
      })
    })
    .collect::<Result<Vec<_>, CompileError>>()?;

  let breakpoints = graph
    .enabled_link_breakpoints()
    .map(|(link, bp)| transform_breakpoint(graph, &link.link_id, bp))
    .collect::<Result<Vec<_>, CompileError>>()?;

  let cached_operator_ids: Vec<String> = graph
    .cached_operators()
    .filter(|id| !graph.is_operator_disabled(id))
    .map(String::from)
    .collect();

  info!(
    operator_count = operators.len(),
    link_count = links.len(),
    breakpoint_count = breakpoints.len(),
    cached_count = cached_operator_ids.len(),
    "compilation complete"
  );
  Ok(LogicalPlan {
    operators,
    links,
    breakpoints,
    cached_operator_ids,
  })
}
