//! Scenario execution
//!
//! A scenario attempt runs its steps in order, each under its own step
//! retrier. The first exhausted step ends the attempt; the scenario
//! retrier then decides whether a fresh attempt starts from step one.

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::context::ExecutionContext;
use super::outcome::Outcome;
use super::retry::{Attempt, Retrier, RetryNotice};
use super::step::StepExecutor;
use crate::common::config::{Config, RebindMode};
use crate::events::{EventBus, EventKind};
use crate::suite::{Scenario, Step};

/// Settings shared by every scenario of a run
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Working directory each scenario attempt starts in
    pub working_dir: PathBuf,
    /// Pause at the inter-attempt boundary
    pub retry_delay: Duration,
    /// Record handling on scenario retry
    pub rebind: RebindMode,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            retry_delay: Duration::ZERO,
            rebind: RebindMode::Reuse,
        }
    }
}

impl From<&Config> for RunSettings {
    fn from(config: &Config) -> Self {
        Self {
            working_dir: config.working_dir(),
            retry_delay: Duration::from_millis(config.retry.delay_ms),
            rebind: config.data.on_retry,
        }
    }
}

/// Final result of one scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub feature: String,
    pub name: String,
    pub outcome: Outcome,
    /// Outcome of every scenario attempt
    pub attempts: Vec<Outcome>,
    /// Scenario-scoped retries performed
    pub retries: u32,
    /// Configured scenario-scoped maxRetries
    pub max_retries: u32,
    pub duration_ms: u64,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.outcome.is_passed()
    }
}

/// Runs one scenario, including all of its attempts
pub struct ScenarioRunner<'r> {
    executor: &'r StepExecutor,
    settings: &'r RunSettings,
}

impl<'r> ScenarioRunner<'r> {
    pub fn new(executor: &'r StepExecutor, settings: &'r RunSettings) -> Self {
        Self { executor, settings }
    }

    pub async fn run(&self, scenario: &Scenario, bus: &mut EventBus) -> ScenarioReport {
        let started = Instant::now();
        let ctx = ExecutionContext::for_scenario(scenario, &self.settings.working_dir);
        let scope = ctx.scope();

        bus.publish(EventKind::ScenarioBefore, scenario.display_name.as_str(), &scope);
        tracing::debug!(
            scenario = %scenario.qualified_name(),
            max_retries = scenario.retry.max_retries,
            "Scenario started"
        );

        let mut unit = ScenarioAttempt {
            executor: self.executor,
            settings: self.settings,
            scenario,
            bus: &mut *bus,
            ctx,
        };
        let run = Retrier::new(scenario.retry)
            .with_delay(self.settings.retry_delay)
            .run(&mut unit)
            .await;
        let scope = unit.ctx.scope();

        if let Outcome::Failed { reason } = &run.outcome {
            bus.publish(
                EventKind::ScenarioFailed,
                format!("{}: {}", scenario.display_name, reason),
                &scope,
            );
        }
        bus.publish(EventKind::ScenarioAfter, scenario.display_name.as_str(), &scope);

        let retries = run.retries();
        tracing::debug!(
            scenario = %scenario.qualified_name(),
            passed = run.outcome.is_passed(),
            retries,
            "Scenario finished"
        );

        ScenarioReport {
            feature: scenario.feature.clone(),
            name: scenario.display_name.clone(),
            outcome: run.outcome,
            attempts: run.history,
            retries,
            max_retries: scenario.retry.max_retries,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// One scenario as a retryable unit
struct ScenarioAttempt<'a> {
    executor: &'a StepExecutor,
    settings: &'a RunSettings,
    scenario: &'a Scenario,
    bus: &'a mut EventBus,
    ctx: ExecutionContext,
}

#[async_trait]
impl<'a> Attempt for ScenarioAttempt<'a> {
    async fn attempt(&mut self, attempt: u32) -> Outcome {
        self.ctx.begin_attempt(attempt, &self.settings.working_dir);

        if attempt > 0 && self.settings.rebind == RebindMode::Reexpand {
            match self.scenario.rebind() {
                Ok(record) => self.ctx.record = record,
                Err(e) => return Outcome::failed(e.to_string()),
            }
        }

        for (index, step) in self.scenario.steps.iter().enumerate() {
            self.ctx.step = Some(index);
            self.ctx.step_attempt = 0;

            let mut unit = StepAttempt {
                executor: self.executor,
                step,
                bus: &mut *self.bus,
                ctx: &mut self.ctx,
            };
            let run = Retrier::new(step.retry)
                .with_delay(self.settings.retry_delay)
                .run(&mut unit)
                .await;

            if let Outcome::Failed { reason } = run.outcome {
                self.ctx.step = None;
                return Outcome::Failed { reason };
            }
        }

        self.ctx.step = None;
        Outcome::Passed
    }

    fn on_retry(&mut self, notice: &RetryNotice) {
        self.ctx.step = None;
        self.bus.publish(
            EventKind::ScenarioRetry,
            notice.payload(&self.scenario.display_name),
            &self.ctx.scope(),
        );
    }
}

/// One step as a retryable unit
struct StepAttempt<'a> {
    executor: &'a StepExecutor,
    step: &'a Step,
    bus: &'a mut EventBus,
    ctx: &'a mut ExecutionContext,
}

#[async_trait]
impl<'a> Attempt for StepAttempt<'a> {
    async fn attempt(&mut self, attempt: u32) -> Outcome {
        self.ctx.step_attempt = attempt;
        self.executor.execute(self.step, self.ctx, self.bus).await
    }

    fn on_retry(&mut self, notice: &RetryNotice) {
        let label = StepExecutor::label(self.step, self.ctx);
        self.bus.publish(
            EventKind::StepRetry,
            notice.payload(&label),
            &self.ctx.scope(),
        );
    }
}
