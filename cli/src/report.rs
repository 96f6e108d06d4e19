//! Rendering a [`RaceReport`] for the terminal.

use std::fmt::Write as _;
use std::process::ExitCode;
use std::time::Duration;

use lookout_core::{Outcome, RaceReport};

pub const EXIT_WON: u8 = 0;
pub const EXIT_SETUP: u8 = 1;
pub const EXIT_TIMED_OUT: u8 = 2;
pub const EXIT_ALL_FAILED: u8 = 3;

#[must_use]
pub const fn exit_status(outcome: &Outcome) -> u8 {
    match outcome {
        Outcome::Won(_) => EXIT_WON,
        Outcome::TimedOut => EXIT_TIMED_OUT,
        Outcome::AllFailed => EXIT_ALL_FAILED,
    }
}

#[must_use]
pub fn exit_code(outcome: &Outcome) -> ExitCode {
    ExitCode::from(exit_status(outcome))
}

/// Human-readable report. `timeout` is the deadline the race ran under.
#[must_use]
pub fn render_text(report: &RaceReport, timeout: Duration) -> String {
    let mut out = String::new();
    match &report.outcome {
        Outcome::Won(envelope) => {
            let _ = writeln!(out, "provider: {}", envelope.provider());
            for (name, value) in envelope.fields() {
                let _ = writeln!(out, "{name}: {value}");
            }
        }
        Outcome::TimedOut => {
            let _ = writeln!(out, "no provider answered within {} ms", timeout.as_millis());
            render_failures(&mut out, report);
        }
        Outcome::AllFailed => {
            let _ = writeln!(out, "all providers failed:");
            render_failures(&mut out, report);
        }
    }
    out
}

fn render_failures(out: &mut String, report: &RaceReport) {
    for failure in &report.failures {
        let _ = writeln!(out, "  {failure}");
    }
}

pub fn render_json(report: &RaceReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
