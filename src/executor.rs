//! Command dispatch and the inbound event pump for one workflow execution.
//!
//! [WorkflowExecutor] owns the state store, both halves of the workflow channel and
//! the debounced execute timer. Everything runs on the task that drives
//! [WorkflowExecutor::process_next]: events, watchdog expiry and the debounced send
//! are handled one at a time, so the state is never touched concurrently.

use std::collections::HashMap;
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{Stream, StreamExt, future};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Sleep, sleep};
use tracing::{debug, error, info, instrument, warn};

use crate::codec::decode_event;
use crate::compiler::{compile_logical_plan, logical_operator, transform_breakpoint};
use crate::config::ExecutionConfig;
use crate::error::{CompileError, ExecutionError};
use crate::lock::LockCoordinator;
use crate::reducer::reduce;
use crate::state_store::{ExecutionStateStore, StateTransition};
use crate::types::{
  Breakpoint, BreakpointTriggerInfo, ClientRequest, Command, ExecutionState, LogicalPlan,
  ServerEvent, WorkflowGraph,
};

/// Cached result pagination owned by the surrounding client.
///
/// Only told that a fresh run is starting; whatever it caches is its own concern.
pub trait ResultSession: Send + Sync {
  fn mark_stale(&self);
}

/// In-memory [ResultSession] that records the stale signal until taken.
#[derive(Debug, Default)]
pub struct StaleResultFlag {
  stale: AtomicBool,
}

impl StaleResultFlag {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns whether the session was marked stale since the last call, clearing the mark.
  pub fn take(&self) -> bool {
    self.stale.swap(false, Ordering::SeqCst)
  }
}

impl ResultSession for StaleResultFlag {
  fn mark_stale(&self) {
    self.stale.store(true, Ordering::SeqCst);
  }
}

/// Client half of the bidirectional workflow channel.
#[derive(Debug)]
pub struct WorkflowChannel {
  pub outbound: mpsc::UnboundedSender<ClientRequest>,
  pub inbound: mpsc::Receiver<ServerEvent>,
}

/// Engine-facing half of a [WorkflowChannel], for transports and tests.
#[derive(Debug)]
pub struct RemoteEnd {
  pub requests: mpsc::UnboundedReceiver<ClientRequest>,
  pub events: mpsc::Sender<ServerEvent>,
}

impl WorkflowChannel {
  /// Creates a connected pair. `capacity` bounds the inbound event queue.
  pub fn pair(capacity: usize) -> (WorkflowChannel, RemoteEnd) {
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (evt_tx, evt_rx) = mpsc::channel(capacity.max(1));
    (
      WorkflowChannel {
        outbound: req_tx,
        inbound: evt_rx,
      },
      RemoteEnd {
        requests: req_rx,
        events: evt_tx,
      },
    )
  }
}

/// A compiled plan waiting out the debounce window.
struct PendingExecute {
  timer: Pin<Box<Sleep>>,
  plan: LogicalPlan,
}

enum Wake {
  Event(Option<ServerEvent>),
  TimedOut,
  Debounced,
}

pub struct WorkflowExecutor {
  config: ExecutionConfig,
  store: ExecutionStateStore,
  outbound: mpsc::UnboundedSender<ClientRequest>,
  inbound: mpsc::Receiver<ServerEvent>,
  inbound_closed: bool,
  results: Arc<dyn ResultSession>,
  pending_execute: Option<PendingExecute>,
}

impl WorkflowExecutor {
  pub fn new(
    config: ExecutionConfig,
    channel: WorkflowChannel,
    lock: Arc<dyn LockCoordinator>,
    results: Arc<dyn ResultSession>,
  ) -> Self {
    let store = ExecutionStateStore::new(lock, config.transition_buffer);
    Self {
      config,
      store,
      outbound: channel.outbound,
      inbound: channel.inbound,
      inbound_closed: false,
      results,
      pending_execute: None,
    }
  }

  pub fn config(&self) -> &ExecutionConfig {
    &self.config
  }

  pub fn execution_state(&self) -> &ExecutionState {
    self.store.get()
  }

  /// Error map of the current state, only while `Aborted`.
  pub fn error_messages(&self) -> Option<&HashMap<String, String>> {
    self.store.get().error_messages()
  }

  /// Breakpoint payload of the current state, only while `BreakpointTriggered`.
  pub fn breakpoint_trigger_info(&self) -> Option<&BreakpointTriggerInfo> {
    self.store.get().breakpoint()
  }

  pub fn subscribe(&self) -> broadcast::Receiver<StateTransition> {
    self.store.subscribe()
  }

  /// State changes as a stream. Transitions missed by a lagging consumer are skipped.
  pub fn transitions(&self) -> impl Stream<Item = StateTransition> + use<> {
    self
      .store
      .transitions()
      .filter_map(|t| future::ready(t.ok()))
  }

  pub fn is_timeout_armed(&self) -> bool {
    self.store.timeout_guard().is_armed()
  }

  pub fn has_pending_execute(&self) -> bool {
    self.pending_execute.is_some()
  }

  /// Abandons the current job: back to `Uninitialized` without publishing, dropping
  /// the armed watchdog and any execute still in its debounce window.
  ///
  /// A command sent for the abandoned job therefore never aborts the next one.
  pub fn reset_execution_state(&mut self) {
    if self.pending_execute.take().is_some() {
      debug!("dropping debounced execute on reset");
    }
    self.store.reset();
  }

  /// Compiles `graph` and schedules its submission after the debounce window.
  ///
  /// A second call inside the window replaces the pending plan. The watchdog is armed
  /// immediately. Must be called from within a tokio runtime.
  #[instrument(level = "trace", skip(self, graph))]
  pub fn execute(&mut self, graph: &WorkflowGraph) -> Result<(), ExecutionError> {
    self.check(Command::Execute)?;
    let plan = compile_logical_plan(graph)?;
    let replaced = self.pending_execute.replace(PendingExecute {
      timer: Box::pin(sleep(self.config.form_debounce)),
      plan,
    });
    if replaced.is_some() {
      debug!("coalesced execute into the pending debounce window");
    }
    self.arm(Command::Execute);
    self.results.mark_stale();
    Ok(())
  }

  #[instrument(level = "trace", skip(self))]
  pub fn pause(&mut self) -> Result<(), ExecutionError> {
    if !self.pause_resume_allowed(Command::Pause) {
      return Ok(());
    }
    self.check(Command::Pause)?;
    self.send(ClientRequest::WorkflowPauseRequest)?;
    self.arm(Command::Pause);
    Ok(())
  }

  #[instrument(level = "trace", skip(self))]
  pub fn resume(&mut self) -> Result<(), ExecutionError> {
    if !self.pause_resume_allowed(Command::Resume) {
      return Ok(());
    }
    self.check(Command::Resume)?;
    self.send(ClientRequest::WorkflowResumeRequest)?;
    self.arm(Command::Resume);
    Ok(())
  }

  #[instrument(level = "trace", skip(self))]
  pub fn kill(&mut self) -> Result<(), ExecutionError> {
    if !self.pause_resume_allowed(Command::Kill) {
      return Ok(());
    }
    self.check(Command::Kill)?;
    self.send(ClientRequest::WorkflowKillRequest)
  }

  /// Sets a breakpoint on `link_id` while the job is stopped.
  #[instrument(level = "trace", skip(self, graph, breakpoint))]
  pub fn add_breakpoint(
    &mut self,
    graph: &WorkflowGraph,
    link_id: &str,
    breakpoint: &Breakpoint,
  ) -> Result<(), ExecutionError> {
    self.check(Command::AddBreakpoint)?;
    let info = transform_breakpoint(graph, link_id, breakpoint)?;
    self.send(ClientRequest::AddBreakpointRequest(info))
  }

  /// Skips every faulted tuple in the current breakpoint report, one request each.
  #[instrument(level = "trace", skip(self))]
  pub fn skip_tuples(&mut self) -> Result<(), ExecutionError> {
    self.check(Command::SkipTuples)?;
    let requests: Vec<ClientRequest> = self
      .store
      .get()
      .breakpoint()
      .map(|info| {
        info
          .report
          .iter()
          .map(|fault| ClientRequest::SkipTupleRequest {
            faulted_tuple: fault.faulted_tuple.clone(),
            actor_path: fault.actor_path.clone(),
          })
          .collect()
      })
      .unwrap_or_default();
    for request in requests {
      self.send(request)?;
    }
    Ok(())
  }

  #[instrument(level = "trace", skip(self))]
  pub fn retry_execution(&mut self) -> Result<(), ExecutionError> {
    self.check(Command::Retry)?;
    self.send(ClientRequest::RetryRequest)
  }

  /// Sends the graph's current definition of `operator_id` to the running job.
  #[instrument(level = "trace", skip(self, graph))]
  pub fn modify_operator_logic(
    &mut self,
    graph: &WorkflowGraph,
    operator_id: &str,
  ) -> Result<(), ExecutionError> {
    self.check(Command::ModifyOperatorLogic)?;
    let op = graph
      .operator(operator_id)
      .ok_or_else(|| CompileError::UnknownOperator(operator_id.to_string()))?;
    self.send(ClientRequest::ModifyLogicRequest {
      operator: logical_operator(op),
    })
  }

  /// Folds one engine event into the state. Returns whether the state changed.
  pub fn handle_event(&mut self, event: &ServerEvent) -> bool {
    match reduce(self.store.get(), event) {
      Some(next) => self.store.apply(next),
      None => {
        debug!(event = event.kind(), "event left execution state unchanged");
        false
      }
    }
  }

  /// Decodes a JSON text frame and folds it in. Undecodable frames are logged and dropped.
  pub fn handle_frame(&mut self, frame: &str) -> bool {
    match decode_event(frame) {
      Ok(event) => self.handle_event(&event),
      Err(e) => {
        warn!(error = %e, "dropping undecodable frame");
        false
      }
    }
  }

  /// Waits for the next inbound event, watchdog expiry or debounced send and handles it.
  ///
  /// After the inbound channel closes, the armed watchdog and the debounced send are
  /// still serviced. Returns `false` once the channel is closed and neither is left.
  /// Cancel safe.
  pub async fn process_next(&mut self) -> bool {
    if self.inbound_closed && !self.has_outstanding_work() {
      return false;
    }
    let wake = {
      let Self {
        store,
        inbound,
        inbound_closed,
        pending_execute,
        ..
      } = self;
      tokio::select! {
        biased;

        event = inbound.recv(), if !*inbound_closed => Wake::Event(event),
        _ = store.run_timeout() => Wake::TimedOut,
        () = debounce_elapsed(pending_execute) => Wake::Debounced,
      }
    };

    match wake {
      Wake::Event(Some(event)) => {
        self.handle_event(&event);
        true
      }
      Wake::Event(None) => {
        self.inbound_closed = true;
        info!(
          timeout_armed = self.is_timeout_armed(),
          pending_execute = self.has_pending_execute(),
          "workflow channel closed"
        );
        self.has_outstanding_work()
      }
      Wake::TimedOut => true,
      Wake::Debounced => {
        if let Some(PendingExecute { plan, .. }) = self.pending_execute.take() {
          if let Err(e) = self.send(ClientRequest::WorkflowExecuteRequest(plan)) {
            error!(error = %e, "failed to submit workflow");
          }
        }
        true
      }
    }
  }

  /// Drives [Self::process_next] until the inbound channel closes and the watchdog and
  /// debounced send have run out.
  pub async fn run(&mut self) {
    while self.process_next().await {}
  }

  fn has_outstanding_work(&self) -> bool {
    self.is_timeout_armed() || self.pending_execute.is_some()
  }

  fn check(&self, command: Command) -> Result<(), ExecutionError> {
    let state = self.store.get().tag();
    if command.is_permitted_in(state) {
      Ok(())
    } else {
      Err(ExecutionError::InvalidState { command, state })
    }
  }

  fn pause_resume_allowed(&self, command: Command) -> bool {
    if command.is_pause_resume_control() && !self.config.pause_resume_enabled {
      debug!(%command, "pause/resume control disabled, ignoring");
      return false;
    }
    true
  }

  fn arm(&mut self, command: Command) {
    if let Some(timeout) = command.timeout() {
      self.store.arm_timeout(self.config.execution_timeout, timeout);
    }
  }

  fn send(&self, request: ClientRequest) -> Result<(), ExecutionError> {
    let kind = request.kind();
    self
      .outbound
      .send(request)
      .map_err(|_| ExecutionError::ChannelClosed)?;
    info!(request = kind, "sent request to engine");
    Ok(())
  }
}

async fn debounce_elapsed(pending_execute: &mut Option<PendingExecute>) {
  match pending_execute {
    Some(p) => p.timer.as_mut().await,
    None => pending().await,
  }
}
