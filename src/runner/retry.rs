//! Bounded retry of a unit of work
//!
//! The same retrier drives step-scoped and scenario-scoped policies. Each
//! scope gets its own `Retrier` and counter.

use async_trait::async_trait;
use std::time::Duration;

use super::outcome::Outcome;
use crate::suite::RetryPolicy;

/// Notice handed to the unit before a retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryNotice {
    /// One-based number of the retry about to run
    pub attempt: u32,
    /// Configured policy value
    pub max_retries: u32,
    /// Reason the previous attempt failed
    pub reason: String,
}

impl RetryNotice {
    /// Event payload: `<unit> | Retry #<n> | Retries: <max> | <reason>`
    pub fn payload(&self, unit: &str) -> String {
        format!(
            "{} | Retry #{} | Retries: {} | {}",
            unit, self.attempt, self.max_retries, self.reason
        )
    }
}

/// A retryable unit: one call of `attempt` runs the unit once
#[async_trait]
pub trait Attempt: Send {
    async fn attempt(&mut self, attempt: u32) -> Outcome;

    /// Called between a failed attempt and the next one
    fn on_retry(&mut self, notice: &RetryNotice);
}

/// Final outcome plus the outcome of every attempt
#[derive(Debug, Clone)]
pub struct RetryRun {
    pub outcome: Outcome,
    pub history: Vec<Outcome>,
}

impl RetryRun {
    /// Number of retries that were performed
    pub fn retries(&self) -> u32 {
        self.history
            .iter()
            .filter(|o| matches!(o, Outcome::Retried { .. }))
            .count() as u32
    }
}

/// Runs a unit until it passes or the policy is exhausted
#[derive(Debug, Clone, Copy)]
pub struct Retrier {
    policy: RetryPolicy,
    delay: Duration,
}

impl Retrier {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            delay: Duration::ZERO,
        }
    }

    /// Pause between attempts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn run<U>(&self, unit: &mut U) -> RetryRun
    where
        U: Attempt + ?Sized,
    {
        let max_retries = self.policy.max_retries;
        let mut history = Vec::new();
        let mut attempt = 0;

        loop {
            let reason = match unit.attempt(attempt).await {
                Outcome::Passed => {
                    history.push(Outcome::Passed);
                    return RetryRun {
                        outcome: Outcome::Passed,
                        history,
                    };
                }
                Outcome::Failed { reason } | Outcome::Retried { reason, .. } => reason,
            };

            if attempt >= max_retries {
                tracing::debug!(attempt, max_retries, reason = %reason, "Retries exhausted");
                let outcome = Outcome::Failed { reason };
                history.push(outcome.clone());
                return RetryRun { outcome, history };
            }

            let notice = RetryNotice {
                attempt: attempt + 1,
                max_retries,
                reason,
            };
            tracing::warn!(
                scope = ?self.policy.scope,
                retry = notice.attempt,
                max_retries,
                reason = %notice.reason,
                "Attempt failed, retrying"
            );
            unit.on_retry(&notice);
            history.push(Outcome::Retried {
                attempt: notice.attempt,
                reason: notice.reason,
            });
            attempt += 1;

            self.pause().await;
        }
    }

    async fn pause(&self) {
        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::RetryScope;

    /// Fails `failures` times, then passes
    struct Scripted {
        failures: u32,
        calls: u32,
        notices: Vec<RetryNotice>,
    }

    impl Scripted {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: 0,
                notices: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl Attempt for Scripted {
        async fn attempt(&mut self, attempt: u32) -> Outcome {
            assert_eq!(attempt, self.calls);
            self.calls += 1;
            if self.calls <= self.failures {
                Outcome::failed(format!("boom {}", self.calls))
            } else {
                Outcome::Passed
            }
        }

        fn on_retry(&mut self, notice: &RetryNotice) {
            self.notices.push(notice.clone());
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, RetryScope::Scenario)
    }

    #[tokio::test]
    async fn test_always_failing_unit_emits_k_retries() {
        for k in 0..5 {
            let mut unit = Scripted::new(u32::MAX);
            let run = Retrier::new(policy(k)).run(&mut unit).await;

            assert_eq!(unit.notices.len() as u32, k);
            assert_eq!(unit.calls, k + 1);
            assert_eq!(run.retries(), k);
            assert_eq!(run.outcome, Outcome::failed(format!("boom {}", k + 1)));
        }
    }

    #[tokio::test]
    async fn test_flaky_unit_passes_within_budget() {
        let mut unit = Scripted::new(2);
        let run = Retrier::new(policy(2)).run(&mut unit).await;

        assert_eq!(run.outcome, Outcome::Passed);
        assert_eq!(unit.notices.len(), 2);
        assert_eq!(unit.notices[0].attempt, 1);
        assert_eq!(unit.notices[1].attempt, 2);
        assert_eq!(unit.notices[1].reason, "boom 2");
        assert_eq!(
            run.history,
            vec![
                Outcome::Retried {
                    attempt: 1,
                    reason: "boom 1".to_string()
                },
                Outcome::Retried {
                    attempt: 2,
                    reason: "boom 2".to_string()
                },
                Outcome::Passed,
            ]
        );
    }

    #[tokio::test]
    async fn test_passing_unit_runs_once() {
        let mut unit = Scripted::new(0);
        let run = Retrier::new(policy(3)).run(&mut unit).await;
        assert_eq!(unit.calls, 1);
        assert!(unit.notices.is_empty());
        assert_eq!(run.history.len(), 1);
    }

    #[test]
    fn test_notice_payload_reports_policy_value() {
        let notice = RetryNotice {
            attempt: 1,
            max_retries: 2,
            reason: "flaky failure 1 of 2".to_string(),
        };
        assert_eq!(
            notice.payload("Not so flaky test"),
            "Not so flaky test | Retry #1 | Retries: 2 | flaky failure 1 of 2"
        );
    }

    #[tokio::test]
    async fn test_delay_between_attempts() {
        let mut unit = Scripted::new(1);
        let started = std::time::Instant::now();
        let run = Retrier::new(policy(1))
            .with_delay(Duration::from_millis(20))
            .run(&mut unit)
            .await;

        assert!(run.outcome.is_passed());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
