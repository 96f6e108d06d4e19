use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ProviderId;

/// Why a single provider attempt did not produce an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The query cannot be expressed as a request to this provider.
    InvalidQuery,
    /// Connection, TLS, or body read failure.
    Transport,
    /// Upstream answered with a non-success HTTP status.
    Status(u16),
    /// The payload did not match the provider's schema.
    Decode,
    /// Upstream answered but knows nothing about the query.
    NotFound,
    /// The race ended before this attempt completed.
    Cancelled,
    /// The provider panicked; the panic was contained to its task.
    Panicked,
}

impl FailureKind {
    /// Transient failures a retry decorator may try again.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        match self {
            Self::Transport => true,
            Self::Status(code) => matches!(code, 408 | 409 | 429 | 500..=599),
            Self::InvalidQuery | Self::Decode | Self::NotFound | Self::Cancelled | Self::Panicked => {
                false
            }
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidQuery => f.write_str("invalid query"),
            Self::Transport => f.write_str("transport error"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Decode => f.write_str("malformed payload"),
            Self::NotFound => f.write_str("not found"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Panicked => f.write_str("panicked"),
        }
    }
}

/// A provider-local failure. Recovered by the coordinator, never fatal to the race.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{provider}: {kind}: {message}")]
pub struct ProviderFailure {
    provider: ProviderId,
    kind: FailureKind,
    message: String,
}

impl ProviderFailure {
    #[must_use]
    pub fn new(provider: ProviderId, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn cancelled(provider: ProviderId) -> Self {
        Self::new(provider, FailureKind::Cancelled, "race decided before completion")
    }

    #[must_use]
    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
