//! End-to-end lifecycle tests: a WorkflowExecutor talking to a scripted engine over the
//! in-memory workflow channel, on tokio's paused clock.

use std::sync::Arc;
use std::time::Duration;

use dataflow_exec::types::{
  OperatorCurrentTuples, OperatorLink, OperatorPort, OperatorPredicate, PortDescription,
  WorkerTuples,
};
use dataflow_exec::{
  ClientRequest, ExecutionConfig, ExecutionState, GraphEditLock, RemoteEnd, ServerEvent,
  StaleResultFlag, StateTag, WorkflowChannel, WorkflowExecutor, WorkflowGraph,
};
use tokio::time::Instant;

fn graph() -> WorkflowGraph {
  WorkflowGraph::new()
    .add_operator(
      OperatorPredicate::new("scan", "CSVScan").with_output_ports(vec![PortDescription::new("out")]),
    )
    .add_operator(
      OperatorPredicate::new("sink", "SimpleSink").with_input_ports(vec![PortDescription::new("in")]),
    )
    .add_link(OperatorLink::new(
      "l1",
      OperatorPort::new("scan", "out"),
      OperatorPort::new("sink", "in"),
    ))
}

fn setup(config: ExecutionConfig) -> (WorkflowExecutor, RemoteEnd, Arc<GraphEditLock>) {
  let (channel, remote) = WorkflowChannel::pair(32);
  let lock = Arc::new(GraphEditLock::default());
  let ex = WorkflowExecutor::new(config, channel, lock.clone(), Arc::new(StaleResultFlag::new()));
  (ex, remote, lock)
}

async fn push(ex: &mut WorkflowExecutor, remote: &RemoteEnd, event: ServerEvent) {
  remote.events.send(event).await.expect("executor alive");
  assert!(ex.process_next().await);
}

fn tuples(operator_id: &str, tuple: &str) -> ServerEvent {
  ServerEvent::OperatorCurrentTuplesUpdateEvent(OperatorCurrentTuples {
    operator_id: operator_id.to_string(),
    tuples: vec![WorkerTuples {
      worker_id: format!("{}-w0", operator_id),
      tuple: vec![tuple.to_string()],
    }],
  })
}

#[tokio::test(start_paused = true)]
async fn execute_pause_resume_complete() {
  let (mut ex, mut remote, lock) = setup(ExecutionConfig::default());
  let mut transitions = ex.subscribe();

  ex.execute(&graph()).expect("execute");
  assert!(ex.process_next().await);
  assert!(matches!(
    remote.requests.try_recv(),
    Ok(ClientRequest::WorkflowExecuteRequest(_))
  ));

  push(&mut ex, &remote, ServerEvent::state(StateTag::Initializing)).await;
  push(&mut ex, &remote, ServerEvent::state(StateTag::Running)).await;
  assert!(!ex.is_timeout_armed());
  assert!(!lock.is_modifiable());

  ex.pause().expect("pause");
  assert_eq!(remote.requests.try_recv().ok(), Some(ClientRequest::WorkflowPauseRequest));
  push(&mut ex, &remote, ServerEvent::state(StateTag::Pausing)).await;
  push(&mut ex, &remote, ServerEvent::state(StateTag::Paused)).await;
  push(&mut ex, &remote, tuples("scan", "row-1")).await;
  assert_eq!(
    ex.execution_state()
      .current_tuples()
      .map(|m| m.contains_key("scan")),
    Some(true)
  );
  assert!(!ex.is_timeout_armed());

  ex.resume().expect("resume");
  push(&mut ex, &remote, ServerEvent::state(StateTag::Resuming)).await;
  push(&mut ex, &remote, ServerEvent::state(StateTag::Running)).await;
  push(&mut ex, &remote, ServerEvent::state(StateTag::Completed)).await;
  assert!(lock.is_modifiable());

  let mut seen = Vec::new();
  while let Ok(t) = transitions.try_recv() {
    seen.push(t.current.tag());
  }
  assert_eq!(
    seen,
    vec![
      StateTag::Initializing,
      StateTag::Running,
      StateTag::Pausing,
      StateTag::Paused,
      StateTag::Paused,
      StateTag::Resuming,
      StateTag::Running,
      StateTag::Completed,
    ]
  );
}

#[tokio::test(start_paused = true)]
async fn tuple_update_before_paused_state_is_kept() {
  let (mut ex, remote, _) = setup(ExecutionConfig::default());
  push(&mut ex, &remote, ServerEvent::state(StateTag::Running)).await;
  ex.pause().expect("pause");

  push(&mut ex, &remote, tuples("scan", "row-7")).await;
  assert!(!ex.is_timeout_armed());
  push(&mut ex, &remote, ServerEvent::state(StateTag::Paused)).await;
  let snapshot = ex
    .execution_state()
    .current_tuples()
    .and_then(|m| m.get("scan"))
    .cloned();
  assert_eq!(snapshot.map(|s| s.tuples[0].tuple.clone()), Some(vec!["row-7".to_string()]));
}

#[tokio::test(start_paused = true)]
async fn silent_engine_times_out_pause_with_configured_window() {
  let config = ExecutionConfig::from_lookup(|key| {
    (key == "DATAFLOW_EXEC_TIMEOUT_MS").then(|| "500".to_string())
  });
  let (mut ex, remote, lock) = setup(config);
  push(&mut ex, &remote, ServerEvent::state(StateTag::Running)).await;

  let start = Instant::now();
  ex.pause().expect("pause");
  assert!(ex.process_next().await);
  assert!(start.elapsed() >= Duration::from_millis(500));
  assert!(start.elapsed() < Duration::from_millis(3000));
  assert_eq!(
    ex.execution_state(),
    &ExecutionState::timed_out("pause operation timeout")
  );
  assert!(lock.is_modifiable());
}

#[tokio::test(start_paused = true)]
async fn engine_error_aborts_and_late_running_is_applied() {
  let (mut ex, remote, _) = setup(ExecutionConfig::default());
  ex.execute(&graph()).expect("execute");
  push(
    &mut ex,
    &remote,
    ServerEvent::WorkflowExecutionErrorEvent {
      message: "scan failed".to_string(),
    },
  )
  .await;
  assert_eq!(ex.execution_state().tag(), StateTag::Aborted);
  assert!(!ex.is_timeout_armed());
  // The debounced submission still goes out; the watchdog never fires.
  assert!(ex.has_pending_execute());
  assert!(ex.process_next().await);
  let r = tokio::time::timeout(Duration::from_secs(10), ex.process_next()).await;
  assert!(r.is_err());
  assert_eq!(ex.execution_state().tag(), StateTag::Aborted);
}
