//! Tests for `ExecutionConfig`.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::{
  ENV_EXECUTION_TIMEOUT_MS, ENV_FORM_DEBOUNCE_MS, ENV_PAUSE_RESUME, ENV_TRANSITION_BUFFER,
  ExecutionConfig, MAX_TRANSITION_BUFFER,
};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
  let map: HashMap<String, String> = vars
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
  move |key| map.get(key).cloned()
}

#[test]
fn defaults() {
  let c = ExecutionConfig::default();
  assert_eq!(c.execution_timeout, Duration::from_millis(3000));
  assert_eq!(c.form_debounce, Duration::from_millis(150));
  assert!(c.pause_resume_enabled);
  assert_eq!(c.transition_buffer, 64);
}

#[test]
fn lookup_overrides_each_field() {
  let c = ExecutionConfig::from_lookup(lookup(&[
    (ENV_EXECUTION_TIMEOUT_MS, "500"),
    (ENV_FORM_DEBOUNCE_MS, " 0 "),
    (ENV_PAUSE_RESUME, "false"),
    (ENV_TRANSITION_BUFFER, "8"),
  ]));
  assert_eq!(c.execution_timeout, Duration::from_millis(500));
  assert_eq!(c.form_debounce, Duration::ZERO);
  assert!(!c.pause_resume_enabled);
  assert_eq!(c.transition_buffer, 8);
}

#[test]
fn unparseable_values_fall_back_to_defaults() {
  let c = ExecutionConfig::from_lookup(lookup(&[
    (ENV_EXECUTION_TIMEOUT_MS, "soon"),
    (ENV_PAUSE_RESUME, "maybe"),
  ]));
  assert_eq!(c, ExecutionConfig::default());
}

#[test]
fn deserializes_millis_with_defaults() {
  let c: ExecutionConfig =
    serde_json::from_str(r#"{ "execution_timeout": 1200, "pause_resume_enabled": false }"#)
      .unwrap();
  assert_eq!(c.execution_timeout, Duration::from_millis(1200));
  assert_eq!(c.form_debounce, Duration::from_millis(150));
  assert!(!c.pause_resume_enabled);
}

#[test]
fn out_of_range_transition_buffer_falls_back_to_default() {
  let huge = usize::MAX.to_string();
  for raw in ["0", huge.as_str(), "65537"] {
    let c = ExecutionConfig::from_lookup(lookup(&[(ENV_TRANSITION_BUFFER, raw)]));
    assert_eq!(c.transition_buffer, 64, "{} should be rejected", raw);
  }
  let max = MAX_TRANSITION_BUFFER.to_string();
  let c = ExecutionConfig::from_lookup(lookup(&[(ENV_TRANSITION_BUFFER, max.as_str())]));
  assert_eq!(c.transition_buffer, MAX_TRANSITION_BUFFER);
}
