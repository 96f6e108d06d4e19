use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use lookout_types::{ProviderFailure, ProviderId, Query, ResultEnvelope};

use crate::RaceSignal;

/// Provider attempt future type alias.
pub type ProviderFut<'a> =
    Pin<Box<dyn Future<Output = Result<ResultEnvelope, ProviderFailure>> + Send + 'a>>;

/// One independent source able to answer a query.
///
/// An attempt performs at most one upstream call and never retries; wrap a
/// provider in a decorator if retries are wanted. Implementations should
/// select on [`RaceSignal::cancelled`] (or use [`RaceSignal::guard`]) around
/// every wait so a decided race stops them promptly.
pub trait Provider: Send + Sync {
    fn id(&self) -> &ProviderId;
    fn attempt<'a>(&'a self, query: &'a Query, signal: &'a RaceSignal) -> ProviderFut<'a>;
}

impl<P: Provider + ?Sized> Provider for Arc<P> {
    fn id(&self) -> &ProviderId {
        (**self).id()
    }

    fn attempt<'a>(&'a self, query: &'a Query, signal: &'a RaceSignal) -> ProviderFut<'a> {
        (**self).attempt(query, signal)
    }
}

impl<P: Provider + ?Sized> Provider for Box<P> {
    fn id(&self) -> &ProviderId {
        (**self).id()
    }

    fn attempt<'a>(&'a self, query: &'a Query, signal: &'a RaceSignal) -> ProviderFut<'a> {
        (**self).attempt(query, signal)
    }
}

/// A provider backed by a closure, for callers that only have "a function that
/// performs one lookup".
pub struct FnProvider<F> {
    id: ProviderId,
    attempt: F,
}

impl<F> fmt::Debug for FnProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProvider").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Wraps `attempt` as a [`Provider`]. The closure receives owned clones of the
/// query and signal.
pub fn provider_fn<F, Fut>(id: impl Into<ProviderId>, attempt: F) -> FnProvider<F>
where
    F: Fn(Query, RaceSignal) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ResultEnvelope, ProviderFailure>> + Send + 'static,
{
    FnProvider {
        id: id.into(),
        attempt,
    }
}

impl<F, Fut> Provider for FnProvider<F>
where
    F: Fn(Query, RaceSignal) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ResultEnvelope, ProviderFailure>> + Send + 'static,
{
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn attempt<'a>(&'a self, query: &'a Query, signal: &'a RaceSignal) -> ProviderFut<'a> {
        Box::pin((self.attempt)(query.clone(), signal.clone()))
    }
}
