//! Race coordinator for redundant lookups.
//!
//! # Architecture
//!
//! - [`Provider`] - one independent source able to answer a [`Query`]
//! - [`RaceSignal`] - the shared deadline/cancellation view every provider receives
//! - [`Race`] - fans out to all providers, keeps the first success, cancels the rest
//! - [`race`] - convenience entry point returning only the [`Outcome`]
//!
//! ```text
//! caller -> Race::run(query) -> N provider tasks -> mpsc(capacity N) -> first envelope
//!                                        ^                                   |
//!                                        +------- token.cancel() <-----------+
//! ```
//!
//! # Leak safety
//!
//! Every task sends at most one report and the channel holds one slot per
//! provider, so no send can block after the coordinator stops reading. Losing
//! tasks observe the cancelled token and exit; a detached reaper aborts any
//! that are still alive after the grace period.

mod provider;
mod race;
mod signal;

pub use lookout_types::{
    FailureKind, Outcome, ProviderFailure, ProviderId, Query, RacePhase, RaceReport,
    ResultEnvelope, fields,
};
pub use provider::{FnProvider, Provider, ProviderFut, provider_fn};
pub use race::{DEFAULT_GRACE_PERIOD, DEFAULT_TIMEOUT, Race, race};
pub use signal::RaceSignal;
