//! Suite execution
//!
//! Scenarios run one at a time from a task queue; the next scenario is
//! dequeued only after the previous one, retries included, has finished.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;

use super::actions::ActionRegistry;
use super::outcome::Outcome;
use super::scenario::{RunSettings, ScenarioReport, ScenarioRunner};
use super::step::StepExecutor;
use crate::common::config::Config;
use crate::common::Result;
use crate::events::{EventBus, EventKind, EventRecord, EventScope};
use crate::suite::RunPlan;

/// Final result of a suite run, handed to reporters
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub outcome: Outcome,
    pub scenarios: Vec<ScenarioReport>,
    pub events: Vec<EventRecord>,
    pub duration_ms: u64,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.outcome.is_passed()
    }

    pub fn passed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.scenarios.len() - self.passed_count()
    }

    /// Process exit code: 0 iff every scenario passed
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

/// Sequences scenarios and owns the event bus for the run
pub struct SuiteRunner {
    executor: StepExecutor,
    settings: RunSettings,
    bus: EventBus,
}

impl SuiteRunner {
    pub fn new(actions: ActionRegistry, settings: RunSettings) -> Self {
        Self {
            executor: StepExecutor::new(actions),
            settings,
            bus: EventBus::new(),
        }
    }

    pub fn from_config(config: &Config, actions: ActionRegistry) -> Self {
        Self::new(actions, RunSettings::from(config))
    }

    /// Register a reporter callback for every event of the run
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&EventRecord) + Send + 'static,
    {
        self.bus.subscribe(subscriber);
    }

    /// Run every scenario of the plan in order
    ///
    /// Fails before emitting any event if a step names an unregistered action.
    pub async fn run(mut self, plan: RunPlan) -> Result<SuiteReport> {
        self.executor.actions().verify(&plan.scenarios)?;

        let started = Instant::now();
        let total = plan.len();
        tracing::info!(suite = %plan.suite, scenarios = total, "Running suite");

        self.bus
            .publish(EventKind::SuiteBefore, plan.suite.as_str(), &EventScope::suite());

        let mut queue: VecDeque<_> = plan.scenarios.into_iter().collect();
        let mut reports = Vec::with_capacity(total);
        let runner = ScenarioRunner::new(&self.executor, &self.settings);

        while let Some(scenario) = queue.pop_front() {
            let report = runner.run(&scenario, &mut self.bus).await;
            if !report.passed() {
                tracing::info!(scenario = %scenario.qualified_name(), "Scenario failed");
            }
            reports.push(report);
        }

        let failed = reports.iter().filter(|r| !r.passed()).count();
        let outcome = if failed == 0 {
            Outcome::Passed
        } else {
            Outcome::failed(format!("{} of {} scenarios failed", failed, total))
        };

        self.bus
            .publish(EventKind::SuiteAfter, plan.suite.as_str(), &EventScope::suite());
        tracing::info!(passed = total - failed, failed, "Suite finished");

        Ok(SuiteReport {
            suite: plan.suite,
            outcome,
            scenarios: reports,
            events: self.bus.into_records(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use crate::suite::{DataBinding, RetryPolicy, RetryScope, Scenario, Step};
    use std::sync::{Arc, Mutex};

    fn scenario(title: &str, action: &str, args: &[&str]) -> Scenario {
        Scenario {
            feature: "Sandbox".to_string(),
            title: title.to_string(),
            display_name: title.to_string(),
            steps: vec![Step {
                action: action.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                retry: RetryPolicy::once(RetryScope::Step),
                timeout: None,
            }],
            data: DataBinding::None,
            retry: RetryPolicy::once(RetryScope::Scenario),
        }
    }

    fn plan(scenarios: Vec<Scenario>) -> RunPlan {
        RunPlan {
            suite: "Sandbox".to_string(),
            scenarios,
        }
    }

    fn runner() -> SuiteRunner {
        SuiteRunner::new(ActionRegistry::with_builtins(), RunSettings::default())
    }

    #[tokio::test]
    async fn test_failed_scenario_does_not_stop_suite() {
        let report = runner()
            .run(plan(vec![
                scenario("first", "fail", &["broken"]),
                scenario("second", "say", &["still runs"]),
            ]))
            .await
            .unwrap();

        assert_eq!(report.outcome, Outcome::failed("1 of 2 scenarios failed"));
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.passed_count(), 1);
        assert!(report.scenarios[1].passed());
    }

    #[tokio::test]
    async fn test_events_are_bracketed_and_never_interleave() {
        let report = runner()
            .run(plan(vec![
                scenario("first", "say", &["a"]),
                scenario("second", "say", &["b"]),
            ]))
            .await
            .unwrap();

        assert!(report.passed());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.events.first().unwrap().kind, EventKind::SuiteBefore);
        assert_eq!(report.events.last().unwrap().kind, EventKind::SuiteAfter);

        let scenarios: Vec<&str> = report
            .events
            .iter()
            .filter_map(|e| e.scope.scenario.as_deref())
            .collect();
        let boundary = scenarios.iter().position(|s| *s == "second").unwrap();
        assert!(scenarios[..boundary].iter().all(|s| *s == "first"));
        assert!(scenarios[boundary..].iter().all(|s| *s == "second"));

        for (i, event) in report.events.iter().enumerate() {
            assert_eq!(event.ordinal, i as u64);
        }
    }

    #[tokio::test]
    async fn test_unknown_action_aborts_before_any_event() {
        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        let mut runner = runner();
        runner.subscribe(move |_| *counter.lock().unwrap() += 1);

        let err = runner
            .run(plan(vec![scenario("first", "teleport", &[])]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnknownAction { .. }));
        assert!(err.is_fatal());
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_sees_every_event_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut runner = runner();
        runner.subscribe(move |record| sink.lock().unwrap().push(record.ordinal));

        let report = runner
            .run(plan(vec![scenario("only", "say", &["hi"])]))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), report.events.len());
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_empty_plan_passes() {
        let report = runner().run(plan(Vec::new())).await.unwrap();
        assert!(report.passed());
        assert_eq!(report.events.len(), 2);
    }
}
