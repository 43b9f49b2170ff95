//! docsmith - Help file build engine
//!
//! The CLI wires a build file's tool bindings into the engine, runs the
//! build while rendering its event stream, and maps the terminal state
//! to an exit code. All engine output arrives through events; tracing
//! is reserved for the CLI's own diagnostics.

mod cli;
mod error;
mod events;
mod manifest;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::events::EventHandler;
use crate::manifest::BuildFile;
use clap::Parser;
use console::style;
use docsmith_engine::{BuildContext, BuildEngine};
use docsmith_types::{BuildReport, BuildStep};
use std::path::Path;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit code for a canceled build, matching interrupted-by-signal convention
const EXIT_CANCELED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.debug);

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("application error: {e}");
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug { "docsmith=debug" } else { "docsmith=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<i32, CliError> {
    match cli.command {
        Commands::Steps => {
            render_steps(cli.global.json);
            Ok(0)
        }
        Commands::Build { build_file } => {
            build(&build_file, cli.global.json, cli.global.debug).await
        }
    }
}

/// Render the step catalog: the published enumeration surface.
fn render_steps(json: bool) {
    if json {
        let steps: Vec<serde_json::Value> = BuildStep::execution_order()
            .iter()
            .map(|step| {
                serde_json::json!({
                    "step": step,
                    "description": step.description(),
                    "skippable": step.can_skip(),
                })
            })
            .collect();
        match serde_json::to_string_pretty(&steps) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("serialization failed: {e}"),
        }
        return;
    }
    let total = BuildStep::execution_order().len();
    for (idx, step) in BuildStep::execution_order().iter().enumerate() {
        println!(
            "{} {:<38} {}",
            style(format!("[{:>2}/{total}]", idx + 1)).dim(),
            step.to_string(),
            style(step.description()).dim()
        );
    }
    println!();
    for outcome in [BuildStep::Completed, BuildStep::Canceled, BuildStep::Failed] {
        println!(
            "  {:<8} {}",
            outcome.to_string(),
            style(outcome.description()).dim()
        );
    }
}

async fn build(build_file: &Path, json: bool, debug: bool) -> Result<i32, CliError> {
    let file = BuildFile::load(build_file)?;
    info!("loaded build file for {}", file.project);

    let engine = BuildEngine::new(file.executor_registry()).with_plugins(file.plugin_host()?);

    let (event_sender, mut event_receiver) = docsmith_events::channel();
    let ctx = BuildContext::new(&file.project).with_event_sender(event_sender);
    let cancel = ctx.cancel_token();

    let mut handler = EventHandler::new(json, debug);
    let mut build_task = tokio::spawn(async move { engine.run(ctx).await });

    let report = loop {
        tokio::select! {
            result = &mut build_task => {
                let report = result
                    .map_err(|e| CliError::Engine(docsmith_errors::Error::internal(e.to_string())))?;
                break report;
            }
            Some(event) = event_receiver.recv() => {
                handler.handle_event(&event);
            }
            _ = tokio::signal::ctrl_c() => {
                cancel.request();
                handler.cancel_requested();
            }
        }
    };

    // The engine is done; drain whatever the channel still holds.
    while let Ok(event) = event_receiver.try_recv() {
        handler.handle_event(&event);
    }

    if json {
        match serde_json::to_string(&report) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("report serialization failed: {e}"),
        }
    }

    Ok(exit_code(&report))
}

fn exit_code(report: &BuildReport) -> i32 {
    match report.outcome {
        BuildStep::Completed => 0,
        BuildStep::Canceled => EXIT_CANCELED,
        _ => 1,
    }
}
