use lookout_core::{
    Provider, ProviderFailure, ProviderFut, ProviderId, Query, RaceSignal, ResultEnvelope, fields,
};
use serde::Deserialize;

use crate::{BRASIL_API_BASE_URL, fetch_json, join_url, normalize_cep};

pub const PROVIDER_ID: &str = "brasilapi";

/// BrasilAPI `/api/cep/v1/{cep}` response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CepResponse {
    cep: String,
    state: String,
    city: String,
    neighborhood: String,
    street: String,
}

impl CepResponse {
    fn into_envelope(self, provider: ProviderId) -> ResultEnvelope {
        ResultEnvelope::new(provider)
            .with_field(fields::POSTAL_CODE, self.cep)
            .with_field(fields::CITY, self.city)
            .with_field(fields::REGION, self.state)
            .with_field(fields::STREET, self.street)
            .with_field(fields::NEIGHBORHOOD, self.neighborhood)
    }
}

#[derive(Debug, Clone)]
pub struct BrasilApi {
    id: ProviderId,
    client: reqwest::Client,
    base_url: String,
}

impl BrasilApi {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            id: ProviderId::from_static(PROVIDER_ID),
            client,
            base_url: BRASIL_API_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, cep: &str) -> String {
        join_url(&self.base_url, &format!("api/cep/v1/{cep}"))
    }

    async fn lookup(&self, query: &Query, signal: &RaceSignal) -> Result<ResultEnvelope, ProviderFailure> {
        let cep = normalize_cep(&self.id, query)?;
        let response: CepResponse = fetch_json(&self.client, &self.id, &self.url(&cep), signal).await?;
        Ok(response.into_envelope(self.id.clone()))
    }
}

impl Provider for BrasilApi {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn attempt<'a>(&'a self, query: &'a Query, signal: &'a RaceSignal) -> ProviderFut<'a> {
        Box::pin(self.lookup(query, signal))
    }
}
