//! Lifecycle commands and their state preconditions.

use std::fmt;

use super::StateTag;

/// Timeout armed by a command: failure message and the states that acknowledge it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTimeout {
  pub message: &'static str,
  pub clear_states: &'static [StateTag],
}

/// A lifecycle command the client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
  Execute,
  Pause,
  Resume,
  Kill,
  AddBreakpoint,
  SkipTuples,
  Retry,
  ModifyOperatorLogic,
}

impl Command {
  pub const ALL: [Command; 8] = [
    Command::Execute,
    Command::Pause,
    Command::Resume,
    Command::Kill,
    Command::AddBreakpoint,
    Command::SkipTuples,
    Command::Retry,
    Command::ModifyOperatorLogic,
  ];

  /// Whether the command may be issued while the execution is in `state`.
  pub fn is_permitted_in(self, state: StateTag) -> bool {
    use StateTag::*;
    match self {
      Command::Execute => true,
      Command::Pause => state == Running,
      Command::Resume => matches!(state, Paused | BreakpointTriggered),
      Command::Kill => !matches!(state, Uninitialized | Completed),
      Command::AddBreakpoint | Command::ModifyOperatorLogic => {
        matches!(state, BreakpointTriggered | Paused)
      }
      Command::SkipTuples | Command::Retry => state == BreakpointTriggered,
    }
  }

  /// Watchdog armed after sending the command, if any.
  pub fn timeout(self) -> Option<CommandTimeout> {
    match self {
      Command::Execute => Some(CommandTimeout {
        message: "submit workflow timeout",
        clear_states: &[StateTag::Running, StateTag::Aborted],
      }),
      Command::Pause => Some(CommandTimeout {
        message: "pause operation timeout",
        clear_states: &[StateTag::Paused, StateTag::Aborted],
      }),
      Command::Resume => Some(CommandTimeout {
        message: "resume operation timeout",
        clear_states: &[StateTag::Running, StateTag::Aborted],
      }),
      _ => None,
    }
  }

  /// Whether the command is gated by the pause/resume feature flag.
  pub fn is_pause_resume_control(self) -> bool {
    matches!(self, Command::Pause | Command::Resume | Command::Kill)
  }
}

impl fmt::Display for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Command::Execute => "execute workflow",
      Command::Pause => "pause workflow",
      Command::Resume => "resume workflow",
      Command::Kill => "kill workflow",
      Command::AddBreakpoint => "add breakpoint at runtime",
      Command::SkipTuples => "skip tuples",
      Command::Retry => "retry the current tuple",
      Command::ModifyOperatorLogic => "modify logic",
    };
    write!(f, "{}", s)
  }
}
