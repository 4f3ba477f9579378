//! Console rendering of lifecycle events

use colored::Colorize;

use crate::events::{EventKind, EventRecord};
use crate::runner::SuiteReport;
use crate::suite::RunPlan;

/// Turns events into console lines as they are emitted
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    verbose: bool,
    feature: Option<String>,
    failure: Option<String>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Self::default()
        }
    }

    /// Lines to print for one event
    pub fn render(&mut self, record: &EventRecord) -> Vec<String> {
        let mut lines = Vec::new();

        if self.verbose {
            lines.push(record.render().dimmed().to_string());
        }

        match record.kind {
            EventKind::ScenarioBefore => {
                let feature = record.scope.feature.clone();
                if feature.is_some() && feature != self.feature {
                    if let Some(name) = &feature {
                        lines.push(format!("{} --", name.bold()));
                    }
                    self.feature = feature;
                }
                self.failure = None;
            }
            EventKind::StepStart => {
                if self.verbose {
                    lines.push(format!("  {} {}", "•".cyan(), record.payload));
                }
                for line in &record.output {
                    lines.push(format!("    {}", line));
                }
            }
            kind if kind.is_retry() => {
                lines.push(format!("  {} {}", "↻".yellow(), record.payload.yellow()));
            }
            EventKind::ScenarioFailed => {
                self.failure = Some(record.payload.clone());
            }
            EventKind::ScenarioAfter => match self.failure.take() {
                None => lines.push(format!("  {} {}", "✓".green(), record.payload)),
                Some(reason) => {
                    lines.push(format!("  {} {}", "✖".red(), record.payload.red()));
                    lines.push(format!("    {}", reason.dimmed()));
                }
            },
            _ => {}
        }

        lines
    }

    /// Final summary line
    pub fn summary(report: &SuiteReport) -> String {
        let passed = report.passed_count();
        let failed = report.failed_count();
        if report.passed() {
            format!(
                "{} | {} passed   // {}ms",
                "OK".green().bold(),
                passed,
                report.duration_ms
            )
        } else {
            format!(
                "{} | {} passed, {} failed   // {}ms",
                "FAIL".red().bold(),
                passed,
                failed,
                report.duration_ms
            )
        }
    }

    /// Lines describing a plan without running it
    pub fn plan(plan: &RunPlan) -> Vec<String> {
        let mut lines = Vec::new();
        let mut feature: Option<&str> = None;
        for scenario in &plan.scenarios {
            if feature != Some(scenario.feature.as_str()) {
                lines.push(format!("{} --", scenario.feature.bold()));
                feature = Some(scenario.feature.as_str());
            }
            lines.push(format!("  {}", scenario.display_name));
        }
        lines.push(format!("{} scenario(s) selected", plan.len()));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventScope;

    fn record(kind: EventKind, payload: &str, feature: &str) -> EventRecord {
        EventRecord {
            ordinal: 0,
            kind,
            payload: payload.to_string(),
            scope: EventScope {
                feature: Some(feature.to_string()),
                scenario: Some("S".to_string()),
                ..EventScope::default()
            },
            output: Vec::new(),
        }
    }

    #[test]
    fn test_feature_header_printed_once() {
        colored::control::set_override(false);
        let mut reporter = ConsoleReporter::new(false);

        let first = reporter.render(&record(EventKind::ScenarioBefore, "a", "Sandbox"));
        let second = reporter.render(&record(EventKind::ScenarioBefore, "b", "Sandbox"));
        let third = reporter.render(&record(EventKind::ScenarioBefore, "c", "Other"));

        assert_eq!(first, vec!["Sandbox --".to_string()]);
        assert!(second.is_empty());
        assert_eq!(third, vec!["Other --".to_string()]);
    }

    #[test]
    fn test_verbose_step_lines() {
        colored::control::set_override(false);
        let mut reporter = ConsoleReporter::new(true);
        let mut start = record(EventKind::StepStart, "I say \"hi\"", "F");
        start.output = vec!["hi".to_string()];

        let lines = reporter.render(&start);
        assert_eq!(
            lines,
            vec![
                "Emitted | step.start (I say \"hi\")".to_string(),
                "  • I say \"hi\"".to_string(),
                "    hi".to_string(),
            ]
        );
    }

    #[test]
    fn test_failed_scenario_marker() {
        colored::control::set_override(false);
        let mut reporter = ConsoleReporter::new(false);
        reporter.render(&record(EventKind::ScenarioBefore, "S", "F"));
        reporter.render(&record(EventKind::ScenarioFailed, "S: nope", "F"));

        let lines = reporter.render(&record(EventKind::ScenarioAfter, "S", "F"));
        assert_eq!(lines, vec!["  ✖ S".to_string(), "    S: nope".to_string()]);

        reporter.render(&record(EventKind::ScenarioBefore, "T", "F"));
        let lines = reporter.render(&record(EventKind::ScenarioAfter, "T", "F"));
        assert_eq!(lines, vec!["  ✓ T".to_string()]);
    }

    #[test]
    fn test_retry_notices_always_shown() {
        colored::control::set_override(false);
        let mut reporter = ConsoleReporter::new(false);
        let payload = "I flaky \"4\" | Retry #1 | Retries: 4 | flaky failure 1 of 4";

        for kind in [EventKind::StepRetry, EventKind::ScenarioRetry] {
            let lines = reporter.render(&record(kind, payload, "F"));
            assert_eq!(lines, vec![format!("  ↻ {}", payload)]);
        }
    }

    #[test]
    fn test_quiet_mode_hides_emitted_lines() {
        colored::control::set_override(false);
        let mut reporter = ConsoleReporter::new(false);
        assert!(reporter
            .render(&record(EventKind::StepBefore, "I say \"hi\"", "F"))
            .is_empty());
    }
}
