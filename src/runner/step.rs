//! Step execution
//!
//! Every step emits exactly `step.before`, `step.after`, `step.start` in
//! that order, followed by `step.failed` when the action failed. Nothing
//! awaits between `step.after` and `step.start`.

use std::time::Duration;

use super::actions::{ActionOutput, ActionRegistry};
use super::context::ExecutionContext;
use super::outcome::Outcome;
use crate::common::{Error, Result};
use crate::events::{EventBus, EventKind};
use crate::suite::Step;

/// Runs single steps against the action registry
#[derive(Debug, Clone)]
pub struct StepExecutor {
    actions: ActionRegistry,
}

impl StepExecutor {
    pub fn new(actions: ActionRegistry) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Rendered label for a step in the given context
    pub fn label(step: &Step, ctx: &ExecutionContext) -> String {
        match ctx.render_args(&step.args) {
            Ok(args) => step.label(&args),
            Err(_) => step.label(&step.args),
        }
    }

    /// Execute one attempt of a step
    pub async fn execute(
        &self,
        step: &Step,
        ctx: &mut ExecutionContext,
        bus: &mut EventBus,
    ) -> Outcome {
        // Templates resolve now, against the record bound for this attempt
        let rendered = ctx.render_args(&step.args);
        let label = match &rendered {
            Ok(args) => step.label(args),
            Err(_) => step.label(&step.args),
        };

        bus.publish(EventKind::StepBefore, label.as_str(), &ctx.scope());

        let result = match rendered {
            Ok(args) => self.invoke(step, &args, &label, ctx).await,
            Err(e) => Err(e),
        };

        let output = match &result {
            Ok(output) => output.lines.clone(),
            Err(_) => Vec::new(),
        };

        let scope = ctx.scope();
        bus.publish(EventKind::StepAfter, label.as_str(), &scope);
        bus.publish_with_output(EventKind::StepStart, label.as_str(), &scope, output);

        match result {
            Ok(_) => {
                tracing::debug!(step = %label, "Step passed");
                Outcome::Passed
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::debug!(step = %label, reason = %reason, "Step failed");
                bus.publish(
                    EventKind::StepFailed,
                    format!("{}: {}", label, reason),
                    &scope,
                );
                Outcome::Failed { reason }
            }
        }
    }

    async fn invoke(
        &self,
        step: &Step,
        args: &[String],
        label: &str,
        ctx: &mut ExecutionContext,
    ) -> Result<ActionOutput> {
        let action = self.actions.get(&step.action).ok_or_else(|| {
            Error::step_failed(format!("no action registered as '{}'", step.action))
        })?;

        match step.timeout {
            Some(limit) => tokio::time::timeout(limit, action.perform(args, ctx))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::ActionTimeout {
                        label: label.to_string(),
                        millis: duration_millis(limit),
                    })
                }),
            None => action.perform(args, ctx).await,
        }
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
