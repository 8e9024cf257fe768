//! Executor configuration: watchdog and debounce windows, feature flags.
//!
//! Defaults match the engine protocol. Each field can be overridden from the
//! environment (see [ExecutionConfig::from_env]).

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

/// Window for an engine acknowledgment after execute, pause or resume.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_millis(3000);
/// Delay before sending an execute request, coalescing rapid repeated triggers.
pub const DEFAULT_FORM_DEBOUNCE: Duration = Duration::from_millis(150);
/// Backlog per state-transition subscriber.
pub const DEFAULT_TRANSITION_BUFFER: usize = 64;
/// Largest accepted subscriber backlog.
pub const MAX_TRANSITION_BUFFER: usize = 1 << 16;

pub const ENV_EXECUTION_TIMEOUT_MS: &str = "DATAFLOW_EXEC_TIMEOUT_MS";
pub const ENV_FORM_DEBOUNCE_MS: &str = "DATAFLOW_EXEC_DEBOUNCE_MS";
pub const ENV_PAUSE_RESUME: &str = "DATAFLOW_EXEC_PAUSE_RESUME";
pub const ENV_TRANSITION_BUFFER: &str = "DATAFLOW_EXEC_TRANSITION_BUFFER";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
  #[serde(with = "millis")]
  pub execution_timeout: Duration,
  #[serde(with = "millis")]
  pub form_debounce: Duration,
  /// When false, pause, resume and kill are silently ignored.
  pub pause_resume_enabled: bool,
  pub transition_buffer: usize,
}

impl Default for ExecutionConfig {
  fn default() -> Self {
    Self {
      execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
      form_debounce: DEFAULT_FORM_DEBOUNCE,
      pause_resume_enabled: true,
      transition_buffer: DEFAULT_TRANSITION_BUFFER,
    }
  }
}

impl ExecutionConfig {
  /// Defaults overridden by `DATAFLOW_EXEC_*` environment variables.
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Defaults overridden by whatever `lookup` returns for each `DATAFLOW_EXEC_*` key.
  /// Unparseable values are logged and ignored.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let mut config = Self::default();
    if let Some(ms) = parse_var::<u64>(&lookup, ENV_EXECUTION_TIMEOUT_MS) {
      config.execution_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = parse_var::<u64>(&lookup, ENV_FORM_DEBOUNCE_MS) {
      config.form_debounce = Duration::from_millis(ms);
    }
    if let Some(enabled) = parse_var::<bool>(&lookup, ENV_PAUSE_RESUME) {
      config.pause_resume_enabled = enabled;
    }
    match parse_var::<usize>(&lookup, ENV_TRANSITION_BUFFER) {
      Some(n) if (1..=MAX_TRANSITION_BUFFER).contains(&n) => config.transition_buffer = n,
      Some(n) => {
        warn!(
          key = ENV_TRANSITION_BUFFER,
          value = n,
          max = MAX_TRANSITION_BUFFER,
          "ignoring out-of-range configuration value"
        );
      }
      None => {}
    }
    config
  }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
  let raw = lookup(key)?;
  match raw.trim().parse() {
    Ok(v) => Some(v),
    Err(_) => {
      warn!(key, value = %raw, "ignoring unparseable configuration value");
      None
    }
  }
}

mod millis {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer};

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_millis)
  }
}
