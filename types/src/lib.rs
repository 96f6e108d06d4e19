//! Core domain types for Lookout.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! The race coordinator, the provider adapters, and the CLI all speak in these types.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod envelope;
mod failure;
mod ids;
mod outcome;

pub use envelope::{ResultEnvelope, fields};
pub use failure::{FailureKind, ProviderFailure};
pub use ids::ProviderId;
pub use outcome::{Outcome, PhaseError, RacePhase, RaceReport};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Query
// ============================================================================

/// The input every provider in a race is asked to resolve.
///
/// Opaque to the coordinator. Cloning is cheap so each spawned task can own one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Query(Arc<str>);

#[derive(Debug, Error)]
#[error("query must not be empty")]
pub struct EmptyQueryError;

impl Query {
    pub fn new(value: impl AsRef<str>) -> Result<Self, EmptyQueryError> {
        let value = value.as_ref().trim();
        if value.is_empty() {
            Err(EmptyQueryError)
        } else {
            Ok(Self(Arc::from(value)))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Query {
    type Error = EmptyQueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Query {
    type Error = EmptyQueryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Query> for String {
    fn from(value: Query) -> Self {
        value.0.as_ref().to_owned()
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
