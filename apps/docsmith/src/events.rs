//! Event handling and progress display

use console::style;
use docsmith_events::{AppEvent, BuildEvent, EventMeta, FailureContext, GeneralEvent};
use docsmith_types::Uuid;
use serde::Serialize;

/// Envelope written in `--json` mode: event metadata plus the event.
#[derive(Serialize)]
struct EventEnvelope<'a> {
    meta: EventMeta,
    #[serde(flatten)]
    event: &'a AppEvent,
}

/// Renders the engine's event stream for the terminal
pub struct EventHandler {
    json: bool,
    debug: bool,
    run_id: Option<Uuid>,
}

impl EventHandler {
    /// Create a new event handler
    pub fn new(json: bool, debug: bool) -> Self {
        Self {
            json,
            debug,
            run_id: None,
        }
    }

    /// Handle one incoming event
    pub fn handle_event(&mut self, event: &AppEvent) {
        if self.json {
            self.write_json(event);
            return;
        }
        match event {
            AppEvent::Build(build) => self.handle_build_event(build),
            AppEvent::General(general) => self.handle_general_event(general),
        }
    }

    /// Note that the user asked for cancellation (Ctrl-C).
    pub fn cancel_requested(&self) {
        if !self.json {
            eprintln!(
                "{}",
                style("Cancellation requested; finishing the current step...").yellow()
            );
        }
    }

    fn write_json(&mut self, event: &AppEvent) {
        if let AppEvent::Build(BuildEvent::RunStarted { run_id, .. }) = event {
            self.run_id = Some(*run_id);
        }
        let mut meta = EventMeta::new(event.level(), event.event_source());
        if let Some(run_id) = self.run_id {
            meta = meta.with_correlation_id(run_id.to_string());
        }
        let envelope = EventEnvelope { meta, event };
        match serde_json::to_string(&envelope) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("event serialization failed: {e}"),
        }
    }

    fn handle_build_event(&mut self, event: &BuildEvent) {
        match event {
            BuildEvent::RunStarted {
                run_id,
                project,
                step_count,
            } => {
                self.run_id = Some(*run_id);
                println!(
                    "{} {} ({} steps)",
                    style("Building").bold(),
                    style(project).cyan(),
                    step_count
                );
            }
            BuildEvent::StepStarted {
                step,
                position,
                total,
            } => {
                println!(
                    "{} {}",
                    style(format!("[{position:>2}/{total}]")).dim(),
                    step.description()
                );
            }
            BuildEvent::StepSkipped { step, plugin } => {
                println!(
                    "        {} {} ({})",
                    style("↷").yellow(),
                    style(format!("{step} skipped")).dim(),
                    plugin
                );
            }
            BuildEvent::StepSucceeded { step, elapsed } => {
                println!(
                    "        {} {} ({})",
                    style("✓").green(),
                    step,
                    format_elapsed(elapsed.as_millis())
                );
            }
            BuildEvent::StepFailed { step, failure, .. } => {
                eprintln!("        {} {} failed", style("✗").red().bold(), step);
                self.print_failure(failure);
            }
            BuildEvent::StepCanceled { step, .. } => {
                println!("        {} {} canceled", style("⊘").yellow(), step);
            }
            BuildEvent::RunCompleted {
                elapsed,
                steps_run,
                steps_skipped,
                ..
            } => {
                println!(
                    "{} {} steps run, {} skipped, {}",
                    style("Build completed:").green().bold(),
                    steps_run,
                    steps_skipped,
                    format_elapsed(elapsed.as_millis())
                );
            }
            BuildEvent::RunCanceled { elapsed, .. } => {
                println!(
                    "{} after {}",
                    style("Build canceled").yellow().bold(),
                    format_elapsed(elapsed.as_millis())
                );
            }
            BuildEvent::RunFailed { step, elapsed, .. } => {
                eprintln!(
                    "{} at {} after {}",
                    style("Build failed").red().bold(),
                    step,
                    format_elapsed(elapsed.as_millis())
                );
            }
        }
    }

    fn handle_general_event(&self, event: &GeneralEvent) {
        match event {
            GeneralEvent::Warning { message, context } => {
                eprint!("{} {message}", style("warning:").yellow().bold());
                if let Some(context) = context {
                    eprint!(" ({context})");
                }
                eprintln!();
            }
            GeneralEvent::Error { message, details } => {
                eprint!("{} {message}", style("error:").red().bold());
                if let Some(details) = details {
                    eprint!(": {details}");
                }
                eprintln!();
            }
            GeneralEvent::DebugLog { message, .. } => {
                if self.debug {
                    eprintln!("{} {message}", style("debug:").dim());
                }
            }
            GeneralEvent::OperationStarted { operation } => {
                println!("{operation}");
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                let mark = if *success {
                    style("✓").green()
                } else {
                    style("✗").red()
                };
                println!("{mark} {operation}");
            }
            GeneralEvent::OperationFailed { operation, error } => {
                eprintln!("{} {operation}: {error}", style("✗").red());
            }
        }
    }

    fn print_failure(&self, failure: &FailureContext) {
        eprintln!("          {}", failure.message);
        if let Some(hint) = &failure.hint {
            eprintln!("          {} {hint}", style("hint:").dim());
        }
    }
}

fn format_elapsed(millis: u128) -> String {
    if millis >= 1000 {
        let seconds = millis as f64 / 1000.0;
        format!("{seconds:.1}s")
    } else {
        format!("{millis}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_formatting_switches_units() {
        assert_eq!(format_elapsed(250), "250ms");
        assert_eq!(format_elapsed(1500), "1.5s");
    }
}
