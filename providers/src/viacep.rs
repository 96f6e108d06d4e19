use lookout_core::{
    FailureKind, Provider, ProviderFailure, ProviderFut, ProviderId, Query, RaceSignal,
    ResultEnvelope, fields,
};
use serde::Deserialize;

use crate::{VIACEP_BASE_URL, fetch_json, join_url, normalize_cep};

pub const PROVIDER_ID: &str = "viacep";

/// ViaCEP `/ws/{cep}/json/` response.
///
/// Unknown CEPs come back as `200 {"erro": true}` (older deployments send the
/// string `"true"`), so the marker is checked before mapping.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CepResponse {
    cep: String,
    logradouro: String,
    bairro: String,
    localidade: String,
    uf: String,
    erro: Option<serde_json::Value>,
}

impl CepResponse {
    fn is_error_marker(&self) -> bool {
        match &self.erro {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    fn into_envelope(self, provider: ProviderId) -> ResultEnvelope {
        ResultEnvelope::new(provider)
            .with_field(fields::POSTAL_CODE, self.cep.replace('-', ""))
            .with_field(fields::CITY, self.localidade)
            .with_field(fields::REGION, self.uf)
            .with_field(fields::STREET, self.logradouro)
            .with_field(fields::NEIGHBORHOOD, self.bairro)
    }
}

#[derive(Debug, Clone)]
pub struct ViaCep {
    id: ProviderId,
    client: reqwest::Client,
    base_url: String,
}

impl ViaCep {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            id: ProviderId::from_static(PROVIDER_ID),
            client,
            base_url: VIACEP_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, cep: &str) -> String {
        join_url(&self.base_url, &format!("ws/{cep}/json/"))
    }

    async fn lookup(&self, query: &Query, signal: &RaceSignal) -> Result<ResultEnvelope, ProviderFailure> {
        let cep = normalize_cep(&self.id, query)?;
        let response: CepResponse = fetch_json(&self.client, &self.id, &self.url(&cep), signal).await?;

        if response.is_error_marker() {
            return Err(ProviderFailure::new(
                self.id.clone(),
                FailureKind::NotFound,
                format!("no record for CEP {cep}"),
            ));
        }

        Ok(response.into_envelope(self.id.clone()))
    }
}

impl Provider for ViaCep {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn attempt<'a>(&'a self, query: &'a Query, signal: &'a RaceSignal) -> ProviderFut<'a> {
        Box::pin(self.lookup(query, signal))
    }
}
