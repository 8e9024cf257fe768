//! Client-held workflow graph snapshot (operators, links, breakpoints).
//!
//! The editor owns the live graph; this crate only reads snapshots of it when
//! compiling a plan or resolving a runtime command.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A declared input or output port of an operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDescription {
  #[serde(rename = "portID")]
  pub port_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub display_name: Option<String>,
}

impl PortDescription {
  pub fn new(port_id: impl Into<String>) -> Self {
    Self {
      port_id: port_id.into(),
      display_name: None,
    }
  }

  pub fn named(port_id: impl Into<String>, display_name: impl Into<String>) -> Self {
    Self {
      port_id: port_id.into(),
      display_name: Some(display_name.into()),
    }
  }
}

/// An operator as held by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorPredicate {
  #[serde(rename = "operatorID")]
  pub operator_id: String,
  pub operator_type: String,
  #[serde(default)]
  pub operator_properties: Map<String, Value>,
  #[serde(default)]
  pub input_ports: Vec<PortDescription>,
  #[serde(default)]
  pub output_ports: Vec<PortDescription>,
  #[serde(default)]
  pub is_disabled: bool,
  #[serde(default)]
  pub is_cached: bool,
}

impl OperatorPredicate {
  pub fn new(operator_id: impl Into<String>, operator_type: impl Into<String>) -> Self {
    Self {
      operator_id: operator_id.into(),
      operator_type: operator_type.into(),
      operator_properties: Map::new(),
      input_ports: vec![],
      output_ports: vec![],
      is_disabled: false,
      is_cached: false,
    }
  }

  pub fn with_input_ports(mut self, ports: Vec<PortDescription>) -> Self {
    self.input_ports = ports;
    self
  }

  pub fn with_output_ports(mut self, ports: Vec<PortDescription>) -> Self {
    self.output_ports = ports;
    self
  }

  pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
    self.operator_properties.insert(key.into(), value);
    self
  }

  pub fn disabled(mut self) -> Self {
    self.is_disabled = true;
    self
  }

  pub fn cached(mut self) -> Self {
    self.is_cached = true;
    self
  }

  /// Zero-based position of `port_id` among the input ports.
  pub fn input_port_ordinal(&self, port_id: &str) -> Option<usize> {
    self.input_ports.iter().position(|p| p.port_id == port_id)
  }

  /// Zero-based position of `port_id` among the output ports.
  pub fn output_port_ordinal(&self, port_id: &str) -> Option<usize> {
    self.output_ports.iter().position(|p| p.port_id == port_id)
  }
}

/// One end of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorPort {
  #[serde(rename = "operatorID")]
  pub operator_id: String,
  #[serde(rename = "portID")]
  pub port_id: String,
}

impl OperatorPort {
  pub fn new(operator_id: impl Into<String>, port_id: impl Into<String>) -> Self {
    Self {
      operator_id: operator_id.into(),
      port_id: port_id.into(),
    }
  }
}

/// A directed link between an output port and an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorLink {
  #[serde(rename = "linkID")]
  pub link_id: String,
  pub source: OperatorPort,
  pub target: OperatorPort,
  #[serde(default)]
  pub is_disabled: bool,
}

impl OperatorLink {
  pub fn new(link_id: impl Into<String>, source: OperatorPort, target: OperatorPort) -> Self {
    Self {
      link_id: link_id.into(),
      source,
      target,
      is_disabled: false,
    }
  }
}

/// Breakpoint data exactly as the editor's form produced it.
///
/// The shape is only known structurally: a `condition` field marks a condition
/// breakpoint, a `count` field a count breakpoint. See [crate::transform_breakpoint].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breakpoint(pub Map<String, Value>);

impl Breakpoint {
  pub fn count(count: u64) -> Self {
    let mut fields = Map::new();
    fields.insert("count".to_string(), Value::from(count));
    Breakpoint(fields)
  }

  pub fn condition(column: u32, condition: &str, value: impl Into<String>) -> Self {
    let mut fields = Map::new();
    fields.insert("column".to_string(), Value::from(column));
    fields.insert("condition".to_string(), Value::from(condition));
    fields.insert("value".to_string(), Value::from(value.into()));
    Breakpoint(fields)
  }

  pub fn has_field(&self, name: &str) -> bool {
    self.0.contains_key(name)
  }
}

/// Snapshot of the editor's workflow graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
  #[serde(default)]
  pub operators: Vec<OperatorPredicate>,
  #[serde(default)]
  pub links: Vec<OperatorLink>,
  /// Breakpoints keyed by link id.
  #[serde(default)]
  pub breakpoints: BTreeMap<String, Breakpoint>,
}

impl WorkflowGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_operator(mut self, operator: OperatorPredicate) -> Self {
    self.operators.push(operator);
    self
  }

  pub fn add_link(mut self, link: OperatorLink) -> Self {
    self.links.push(link);
    self
  }

  pub fn set_breakpoint(mut self, link_id: impl Into<String>, breakpoint: Breakpoint) -> Self {
    self.breakpoints.insert(link_id.into(), breakpoint);
    self
  }

  pub fn operator(&self, operator_id: &str) -> Option<&OperatorPredicate> {
    self.operators.iter().find(|o| o.operator_id == operator_id)
  }

  pub fn link(&self, link_id: &str) -> Option<&OperatorLink> {
    self.links.iter().find(|l| l.link_id == link_id)
  }

  /// Unknown operators count as disabled.
  pub fn is_operator_disabled(&self, operator_id: &str) -> bool {
    self.operator(operator_id).is_none_or(|o| o.is_disabled)
  }

  pub fn enabled_operators(&self) -> impl Iterator<Item = &OperatorPredicate> {
    self.operators.iter().filter(|o| !o.is_disabled)
  }

  /// Links that are not disabled themselves and whose both endpoints are enabled.
  pub fn enabled_links(&self) -> impl Iterator<Item = &OperatorLink> {
    self.links.iter().filter(|l| {
      !l.is_disabled
        && !self.is_operator_disabled(&l.source.operator_id)
        && !self.is_operator_disabled(&l.target.operator_id)
    })
  }

  /// Breakpoints on enabled links, in link order.
  pub fn enabled_link_breakpoints(&self) -> impl Iterator<Item = (&OperatorLink, &Breakpoint)> {
    self
      .enabled_links()
      .filter_map(|l| self.breakpoints.get(&l.link_id).map(|b| (l, b)))
  }

  /// Ids of operators marked cached, in operator order.
  pub fn cached_operators(&self) -> impl Iterator<Item = &str> {
    self
      .operators
      .iter()
      .filter(|o| o.is_cached)
      .map(|o| o.operator_id.as_str())
  }
}
