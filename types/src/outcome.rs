use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ProviderFailure, ResultEnvelope};

/// Terminal decision of one race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The first envelope the coordinator observed.
    Won(ResultEnvelope),
    /// The deadline passed before any provider succeeded.
    TimedOut,
    /// Every launched provider finished without success before the deadline.
    AllFailed,
}

impl Outcome {
    #[must_use]
    pub fn winner(&self) -> Option<&ResultEnvelope> {
        match self {
            Self::Won(envelope) => Some(envelope),
            Self::TimedOut | Self::AllFailed => None,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> RacePhase {
        match self {
            Self::Won(_) => RacePhase::Won,
            Self::TimedOut => RacePhase::TimedOut,
            Self::AllFailed => RacePhase::AllFailed,
        }
    }
}

/// Lifecycle of a race: `Pending -> Racing -> {Won | TimedOut | AllFailed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RacePhase {
    #[default]
    Pending,
    Racing,
    Won,
    TimedOut,
    AllFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal race transition {from:?} -> {to:?}")]
pub struct PhaseError {
    pub from: RacePhase,
    pub to: RacePhase,
}

impl RacePhase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::TimedOut | Self::AllFailed)
    }

    /// Validates a lifecycle step. Terminal phases are absorbing.
    pub const fn transition(self, to: RacePhase) -> Result<RacePhase, PhaseError> {
        match (self, to) {
            // Pending -> AllFailed is a race with no providers to launch.
            (Self::Pending, Self::Racing | Self::AllFailed)
            | (Self::Racing, Self::Won | Self::TimedOut | Self::AllFailed) => Ok(to),
            _ => Err(PhaseError { from: self, to }),
        }
    }
}

/// The outcome of a race plus the diagnostics gathered while deciding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceReport {
    pub outcome: Outcome,
    /// Failures observed before the decision, in arrival order.
    pub failures: Vec<ProviderFailure>,
    /// Number of provider tasks launched.
    pub launched: usize,
    #[serde(rename = "elapsed_ms", with = "duration_ms")]
    pub elapsed: Duration,
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
