//! Plug-in interposition and cancellation behavior of the engine.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docsmith_engine::{
    BuildContext, BuildEngine, BuildPlugin, ExecutorRegistry, FnExecutor, PluginCapabilities,
    PluginHost,
};
use docsmith_errors::{Error, Result};
use docsmith_types::{BuildStep, StepOutcome};

fn succeeding_registry(invoked: &Arc<Mutex<Vec<BuildStep>>>) -> ExecutorRegistry {
    let log = Arc::clone(invoked);
    let mut registry = ExecutorRegistry::new();
    registry.register_default(Arc::new(FnExecutor::new(
        move |step: BuildStep, _: &BuildContext| {
            log.lock().unwrap().push(step);
            Ok(())
        },
    )));
    registry
}

/// Plug-in that skips a fixed step set and logs its hook invocations.
struct TracingPlugin {
    plugin_name: &'static str,
    skip: Vec<BuildStep>,
    calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BuildPlugin for TracingPlugin {
    fn name(&self) -> &str {
        self.plugin_name
    }

    fn should_skip(&self, step: BuildStep, _ctx: &BuildContext) -> bool {
        self.skip.contains(&step)
    }

    async fn before_step(&self, step: BuildStep, _ctx: &BuildContext) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:before:{step}", self.plugin_name));
        Ok(())
    }

    async fn after_step(&self, step: BuildStep, _ctx: &BuildContext) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:after:{step}", self.plugin_name));
        Ok(())
    }
}

#[tokio::test]
async fn skipped_step_keeps_its_catalog_position_without_executing() {
    let invoked = Arc::new(Mutex::new(Vec::new()));
    let registry = succeeding_registry(&invoked);

    let mut plugins = PluginHost::new();
    plugins
        .register(
            Arc::new(TracingPlugin {
                plugin_name: "no-conceptual-content",
                skip: vec![
                    BuildStep::CopyConceptualContent,
                    BuildStep::BuildConceptualTopics,
                ],
                calls: Arc::new(Mutex::new(Vec::new())),
            }),
            vec![
                BuildStep::CopyConceptualContent,
                BuildStep::BuildConceptualTopics,
            ],
            PluginCapabilities::SKIP,
        )
        .unwrap();

    let engine = BuildEngine::new(registry).with_plugins(plugins);
    let report = engine.run(BuildContext::new("docs")).await;

    assert_eq!(report.outcome, BuildStep::Completed);
    assert_eq!(report.steps_skipped(), 2);

    // History still matches the catalog exactly, skips in place
    let recorded: Vec<BuildStep> = report.history.iter().map(|r| r.step).collect();
    assert_eq!(recorded, BuildStep::execution_order());
    for record in &report.history {
        let expected = if record.step == BuildStep::CopyConceptualContent
            || record.step == BuildStep::BuildConceptualTopics
        {
            StepOutcome::Skipped
        } else {
            StepOutcome::Succeeded
        };
        assert_eq!(record.outcome, expected, "{}", record.step);
    }

    // The skipped steps' executors were never invoked
    let ran = invoked.lock().unwrap();
    assert!(!ran.contains(&BuildStep::CopyConceptualContent));
    assert!(!ran.contains(&BuildStep::BuildConceptualTopics));
}

#[tokio::test]
async fn hooks_run_in_registration_order_around_the_executor() {
    let invoked = Arc::new(Mutex::new(Vec::new()));
    let registry = succeeding_registry(&invoked);
    let calls = Arc::new(Mutex::new(Vec::new()));

    let mut plugins = PluginHost::new();
    for name in ["first", "second"] {
        plugins
            .register(
                Arc::new(TracingPlugin {
                    plugin_name: name,
                    skip: Vec::new(),
                    calls: Arc::clone(&calls),
                }),
                vec![BuildStep::CompilingHelpFile],
                PluginCapabilities::PRE_STEP | PluginCapabilities::POST_STEP,
            )
            .unwrap();
    }

    let engine = BuildEngine::new(registry).with_plugins(plugins);
    let report = engine.run(BuildContext::new("docs")).await;
    assert_eq!(report.outcome, BuildStep::Completed);

    let calls = calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![
            "first:before:CompilingHelpFile",
            "second:before:CompilingHelpFile",
            "first:after:CompilingHelpFile",
            "second:after:CompilingHelpFile",
        ]
    );
}

struct FailingHook {
    fail_after: bool,
}

#[async_trait]
impl BuildPlugin for FailingHook {
    fn name(&self) -> &str {
        "failing-hook"
    }

    async fn before_step(&self, _step: BuildStep, _ctx: &BuildContext) -> Result<()> {
        if self.fail_after {
            Ok(())
        } else {
            Err(Error::internal("pre-flight check failed"))
        }
    }

    async fn after_step(&self, _step: BuildStep, _ctx: &BuildContext) -> Result<()> {
        Err(Error::internal("output validation failed"))
    }
}

#[tokio::test]
async fn pre_hook_abort_fails_the_step_without_running_it() {
    let invoked = Arc::new(Mutex::new(Vec::new()));
    let registry = succeeding_registry(&invoked);

    let mut plugins = PluginHost::new();
    plugins
        .register(
            Arc::new(FailingHook { fail_after: false }),
            vec![BuildStep::GenerateApiFilter],
            PluginCapabilities::PRE_STEP,
        )
        .unwrap();

    let engine = BuildEngine::new(registry).with_plugins(plugins);
    let report = engine.run(BuildContext::new("docs")).await;

    assert_eq!(report.outcome, BuildStep::Failed);
    assert_eq!(report.failed_step, Some(BuildStep::GenerateApiFilter));
    assert!(report.error.as_deref().unwrap().contains("failing-hook"));
    assert!(!invoked
        .lock()
        .unwrap()
        .contains(&BuildStep::GenerateApiFilter));
}

#[tokio::test]
async fn post_hook_failure_fails_the_step_after_it_ran() {
    let invoked = Arc::new(Mutex::new(Vec::new()));
    let registry = succeeding_registry(&invoked);

    let mut plugins = PluginHost::new();
    plugins
        .register(
            Arc::new(FailingHook { fail_after: true }),
            vec![BuildStep::GenerateHelpProject],
            PluginCapabilities::PRE_STEP | PluginCapabilities::POST_STEP,
        )
        .unwrap();

    let engine = BuildEngine::new(registry).with_plugins(plugins);
    let report = engine.run(BuildContext::new("docs")).await;

    assert_eq!(report.outcome, BuildStep::Failed);
    assert_eq!(report.failed_step, Some(BuildStep::GenerateHelpProject));
    assert!(report
        .error
        .as_deref()
        .unwrap()
        .contains("output validation failed"));
    // The work unit did run before its post-hook rejected the result
    assert!(invoked
        .lock()
        .unwrap()
        .contains(&BuildStep::GenerateHelpProject));
}

#[tokio::test]
async fn cancellation_before_the_first_step_starts_nothing() {
    let invoked = Arc::new(Mutex::new(Vec::new()));
    let registry = succeeding_registry(&invoked);
    let engine = BuildEngine::new(registry);

    let ctx = BuildContext::new("docs");
    ctx.cancel_token().request();
    let report = engine.run(ctx).await;

    assert_eq!(report.outcome, BuildStep::Canceled);
    assert!(report.history.is_empty());
    assert!(report.error.is_none());
    assert!(invoked.lock().unwrap().is_empty());
}

#[tokio::test]
async fn cancellation_during_a_step_lets_it_finish_then_stops() {
    let invoked = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&invoked);
    let mut registry = ExecutorRegistry::new();
    // The executor itself requests cancellation mid-run, then succeeds;
    // the next step must never start.
    registry.register_default(Arc::new(FnExecutor::new(
        move |step: BuildStep, ctx: &BuildContext| {
            log.lock().unwrap().push(step);
            if step == BuildStep::ValidatingDocumentationSources {
                ctx.cancel_token().request();
            }
            Ok(())
        },
    )));

    let engine = BuildEngine::new(registry);
    let report = engine.run(BuildContext::new("docs")).await;

    assert_eq!(report.outcome, BuildStep::Canceled);
    assert!(report.error.is_none());

    // The interrupted run recorded the finished step as succeeded
    let last = report.history.last().unwrap();
    assert_eq!(last.step, BuildStep::ValidatingDocumentationSources);
    assert_eq!(last.outcome, StepOutcome::Succeeded);
    assert_eq!(
        *invoked.lock().unwrap(),
        vec![
            BuildStep::Initializing,
            BuildStep::ClearWorkFolder,
            BuildStep::ValidatingDocumentationSources,
        ]
    );
}

#[tokio::test]
async fn cooperative_abort_records_the_step_as_canceled() {
    let mut registry = ExecutorRegistry::new();
    registry.register_default(Arc::new(FnExecutor::new(
        |_: BuildStep, _: &BuildContext| Ok(()),
    )));
    registry.register(
        BuildStep::GenerateReflectionInfo,
        Arc::new(FnExecutor::new(|_: BuildStep, ctx: &BuildContext| {
            // A long-running work unit noticing the request part-way
            ctx.cancel_token().request();
            Err(Error::Cancelled)
        })),
    );

    let engine = BuildEngine::new(registry);
    let report = engine.run(BuildContext::new("docs")).await;

    assert_eq!(report.outcome, BuildStep::Canceled);
    assert!(report.error.is_none(), "cancellation is not a failure");
    let last = report.history.last().unwrap();
    assert_eq!(last.step, BuildStep::GenerateReflectionInfo);
    assert_eq!(last.outcome, StepOutcome::Canceled);
}
