//! Plug-in registration and interposition
//!
//! Plug-ins decorate the fixed catalog: they may veto (skip) a step or
//! run code immediately before/after a step's work unit. They never add
//! steps and never reorder the catalog, and only the engine writes the
//! run's history.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use bitflags::bitflags;
use docsmith_errors::{PluginError, Result};
use docsmith_types::BuildStep;
use futures::FutureExt;

use crate::context::BuildContext;

bitflags! {
    /// Which extension points a registration participates in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PluginCapabilities: u8 {
        /// Run `before_step` ahead of the step's work unit
        const PRE_STEP = 1;
        /// Run `after_step` once the work unit succeeds
        const POST_STEP = 1 << 1;
        /// Consult `should_skip` before the step starts
        const SKIP = 1 << 2;
    }
}

/// A build engine extension.
///
/// Default method bodies make every capability opt-in: implement only
/// what the registration's capability set declares.
#[async_trait]
pub trait BuildPlugin: Send + Sync {
    /// Stable name used in events and error reports.
    fn name(&self) -> &str;

    /// Whether `step` should be skipped for this run.
    fn should_skip(&self, _step: BuildStep, _ctx: &BuildContext) -> bool {
        false
    }

    /// Hook run before the step's work unit.
    ///
    /// # Errors
    ///
    /// An error aborts the step: the step is recorded as failed with
    /// this hook's error and the run stops.
    async fn before_step(&self, _step: BuildStep, _ctx: &BuildContext) -> Result<()> {
        Ok(())
    }

    /// Hook run after the step's work unit succeeds.
    ///
    /// # Errors
    ///
    /// An error is treated as a failure of the step itself.
    async fn after_step(&self, _step: BuildStep, _ctx: &BuildContext) -> Result<()> {
        Ok(())
    }
}

/// One registered plug-in with its step set and capabilities.
pub struct PluginRegistration {
    plugin: Arc<dyn BuildPlugin>,
    steps: Vec<BuildStep>,
    capabilities: PluginCapabilities,
}

impl PluginRegistration {
    /// Name of the registered plug-in.
    #[must_use]
    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    /// Steps this registration attaches to.
    #[must_use]
    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    /// Extension points this registration participates in.
    #[must_use]
    pub fn capabilities(&self) -> PluginCapabilities {
        self.capabilities
    }

    fn applies_to(&self, step: BuildStep, capability: PluginCapabilities) -> bool {
        self.capabilities.contains(capability) && self.steps.contains(&step)
    }
}

/// Ordered set of plug-in registrations for a run.
///
/// Registration order is significant for hooks: pre- and post-hooks run
/// in the order their plug-ins were registered. Skip decisions are an
/// OR across all skip-capable registrations. Registration must finish
/// before the run starts; the engine only borrows the host immutably.
#[derive(Default)]
pub struct PluginHost {
    registrations: Vec<PluginRegistration>,
}

impl PluginHost {
    /// Create an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plug-in for a set of catalog steps.
    ///
    /// # Errors
    ///
    /// Rejects registrations with an empty step set, an empty capability
    /// set, or steps outside the executable catalog.
    pub fn register(
        &mut self,
        plugin: Arc<dyn BuildPlugin>,
        steps: Vec<BuildStep>,
        capabilities: PluginCapabilities,
    ) -> Result<()> {
        if capabilities.is_empty() {
            return Err(PluginError::InvalidRegistration {
                plugin: plugin.name().to_string(),
                reason: "no capabilities requested".into(),
            }
            .into());
        }
        if steps.is_empty() {
            return Err(PluginError::InvalidRegistration {
                plugin: plugin.name().to_string(),
                reason: "no steps named".into(),
            }
            .into());
        }
        if let Some(bad) = steps.iter().find(|s| s.position().is_none()) {
            return Err(PluginError::InvalidRegistration {
                plugin: plugin.name().to_string(),
                reason: format!("{bad} is not an executable catalog step"),
            }
            .into());
        }
        self.registrations.push(PluginRegistration {
            plugin,
            steps,
            capabilities,
        });
        Ok(())
    }

    /// Number of registrations held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Iterate over the registrations in registration order.
    pub fn registrations(&self) -> impl Iterator<Item = &PluginRegistration> {
        self.registrations.iter()
    }

    /// Whether no plug-ins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Ask every skip-capable registration whether `step` should be
    /// skipped. Returns the name of the first plug-in voting to skip.
    ///
    /// # Errors
    ///
    /// A panicking predicate is reported as a hook panic and treated as
    /// a failure of the step.
    pub fn skip_decision(&self, step: BuildStep, ctx: &BuildContext) -> Result<Option<String>> {
        for reg in &self.registrations {
            if !reg.applies_to(step, PluginCapabilities::SKIP) {
                continue;
            }
            let vote = std::panic::catch_unwind(AssertUnwindSafe(|| {
                reg.plugin.should_skip(step, ctx)
            }))
            .map_err(|payload| PluginError::HookPanicked {
                plugin: reg.plugin.name().to_string(),
                step,
                message: panic_message(payload.as_ref()),
            })?;
            if vote {
                return Ok(Some(reg.plugin.name().to_string()));
            }
        }
        Ok(None)
    }

    /// Run all pre-step hooks for `step`, in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first hook's abort or panic, wrapped as a plug-in
    /// error naming the plug-in.
    pub async fn run_pre_hooks(&self, step: BuildStep, ctx: &BuildContext) -> Result<()> {
        for reg in &self.registrations {
            if !reg.applies_to(step, PluginCapabilities::PRE_STEP) {
                continue;
            }
            run_hook(reg.plugin.as_ref(), step, reg.plugin.before_step(step, ctx)).await?;
        }
        Ok(())
    }

    /// Run all post-step hooks for `step`, in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first hook's abort or panic, wrapped as a plug-in
    /// error naming the plug-in.
    pub async fn run_post_hooks(&self, step: BuildStep, ctx: &BuildContext) -> Result<()> {
        for reg in &self.registrations {
            if !reg.applies_to(step, PluginCapabilities::POST_STEP) {
                continue;
            }
            run_hook(reg.plugin.as_ref(), step, reg.plugin.after_step(step, ctx)).await?;
        }
        Ok(())
    }
}

async fn run_hook<F>(plugin: &dyn BuildPlugin, step: BuildStep, hook: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    match AssertUnwindSafe(hook).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(PluginError::HookAborted {
            plugin: plugin.name().to_string(),
            step,
            message: err.to_string(),
        }
        .into()),
        Err(payload) => Err(PluginError::HookPanicked {
            plugin: plugin.name().to_string(),
            step,
            message: panic_message(payload.as_ref()),
        }
        .into()),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "hook panicked".to_string())
}
