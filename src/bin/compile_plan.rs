//! CLI: Compile a workflow graph JSON file to the logical plan the engine runs.
//!
//! Usage: `compile_plan [OPTIONS] <path-to-graph-json>`
//! Example: compile_plan --pretty --request workflows/wordcount.json
//!
//! Set RUST_LOG=dataflow_exec=trace for TRACE-level span enter/exit and events.

use clap::Parser;
use dataflow_exec::{ClientRequest, WorkflowGraph, compile_logical_plan, encode_request};
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Compile a workflow graph to a logical plan.
#[derive(Parser, Debug)]
#[command(name = "compile_plan")]
#[command(
  after_help = r#"The graph file holds {"operators": [...], "links": [...], "breakpoints": {...}}.
Disabled operators and links are dropped; breakpoints bind to their link's source operator.

Examples:
  compile_plan graph.json
  compile_plan --request graph.json"#
)]
struct Args {
  /// Pretty-print the output JSON.
  #[arg(long)]
  pretty: bool,

  /// Print the full WorkflowExecuteRequest frame instead of the bare plan.
  #[arg(long)]
  request: bool,

  /// Path to the workflow graph JSON file
  #[arg(value_name = "path-to-graph-json")]
  graph_path: PathBuf,
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  info!(path = %args.graph_path.display(), request = args.request, "compile_plan starting");

  let path = &args.graph_path;
  let raw = match fs::read_to_string(path) {
    Ok(s) => s,
    Err(e) => {
      eprintln!("Error reading {}: {}", path.display(), e);
      process::exit(1);
    }
  };

  let graph: WorkflowGraph = match serde_json::from_str(&raw) {
    Ok(g) => g,
    Err(e) => {
      eprintln!("Error parsing workflow graph: {}", e);
      process::exit(1);
    }
  };

  let plan = match compile_logical_plan(&graph) {
    Ok(p) => p,
    Err(e) => {
      eprintln!("Compile error: {}", e);
      process::exit(1);
    }
  };

  let out = if args.request {
    let request = ClientRequest::WorkflowExecuteRequest(plan);
    if args.pretty {
      serde_json::to_string_pretty(&request).map_err(|e| e.to_string())
    } else {
      encode_request(&request).map_err(|e| e.to_string())
    }
  } else if args.pretty {
    serde_json::to_string_pretty(&plan).map_err(|e| e.to_string())
  } else {
    serde_json::to_string(&plan).map_err(|e| e.to_string())
  };

  match out {
    Ok(json) => println!("{}", json),
    Err(e) => {
      eprintln!("Error encoding output: {}", e);
      process::exit(1);
    }
  }
}
