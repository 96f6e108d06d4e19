//! Postal code lookup providers for the Lookout race coordinator.
//!
//! # Architecture
//!
//! Every adapter implements [`lookout_core::Provider`] and performs exactly one
//! HTTP request per attempt:
//!
//! - [`brasil_api`] - BrasilAPI CEP v1 endpoint
//! - [`viacep`] - ViaCEP JSON endpoint
//! - [`retry`] - optional decorator that retries transient failures within the race deadline
//!
//! The HTTP client is never global. Build one with [`http_client`] and hand a
//! clone to each adapter; `reqwest::Client` is an `Arc` internally.
//!
//! # Field mapping
//!
//! | Envelope field | BrasilAPI | ViaCEP |
//! |----------------|-----------|--------|
//! | `postal_code` | `cep` | `cep` |
//! | `city` | `city` | `localidade` |
//! | `region` | `state` | `uf` |
//! | `street` | `street` | `logradouro` |
//! | `neighborhood` | `neighborhood` | `bairro` |
//!
//! # Error Handling
//!
//! Adapters never return `Err` to their caller in the Rust sense of "abort":
//! every transport, status, and payload problem becomes a
//! [`ProviderFailure`] the coordinator records and moves past.

pub mod brasil_api;
pub mod retry;
pub mod viacep;

pub use brasil_api::BrasilApi;
pub use retry::{RetryConfig, WithRetry};
pub use viacep::ViaCep;

use std::time::Duration;

use lookout_core::{FailureKind, ProviderFailure, ProviderId, Query, RaceSignal};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// Canonical BrasilAPI base URL.
pub const BRASIL_API_BASE_URL: &str = "https://brasilapi.com.br";
/// Canonical ViaCEP base URL.
pub const VIACEP_BASE_URL: &str = "https://viacep.com.br";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

// Note: reqwest only exposes tcp_keepalive (idle time); interval/retries use platform defaults.
const TCP_KEEPALIVE_SECS: u64 = 60;

const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

const CEP_DIGITS: usize = 8;

/// Transport knobs for the shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    /// Refuse plain `http://` URLs. Disable only for local test servers.
    pub https_only: bool,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            https_only: true,
            user_agent: concat!("lookout/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to build HTTP client: {0}")]
pub struct HttpClientError(#[from] reqwest::Error);

/// Builds the client every adapter in a race shares.
///
/// No overall request timeout is set: the race deadline bounds each attempt.
pub fn http_client(settings: &HttpSettings) -> Result<reqwest::Client, HttpClientError> {
    let client = reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .https_only(settings.https_only)
        .user_agent(settings.user_agent.as_str())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .build()?;
    Ok(client)
}

/// Reduces a query to the eight CEP digits, accepting `01153-000` and `01153 000`.
pub fn normalize_cep(provider: &ProviderId, query: &Query) -> Result<String, ProviderFailure> {
    let digits: String = query
        .as_str()
        .chars()
        .filter(|c| !matches!(c, '-' | '.' | ' '))
        .collect();

    if digits.len() == CEP_DIGITS && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(digits)
    } else {
        Err(ProviderFailure::new(
            provider.clone(),
            FailureKind::InvalidQuery,
            format!("{query:?} is not an 8-digit CEP"),
        ))
    }
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Issues one GET and decodes the JSON body, stopping as soon as the race ends.
pub(crate) async fn fetch_json<T>(
    client: &reqwest::Client,
    provider: &ProviderId,
    url: &str,
    signal: &RaceSignal,
) -> Result<T, ProviderFailure>
where
    T: DeserializeOwned,
{
    tracing::debug!(%provider, %url, "Sending lookup request");

    let request = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send();

    let response = match signal.guard(request).await {
        None => return Err(ProviderFailure::cancelled(provider.clone())),
        Some(Err(e)) => {
            return Err(ProviderFailure::new(
                provider.clone(),
                FailureKind::Transport,
                format!("request failed: {e}"),
            ));
        }
        Some(Ok(response)) => response,
    };

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ProviderFailure::new(
            provider.clone(),
            FailureKind::NotFound,
            format!("no record for {url}"),
        ));
    }

    if !status.is_success() {
        let body = signal
            .guard(read_capped_error_body(response))
            .await
            .unwrap_or_default();
        return Err(ProviderFailure::new(
            provider.clone(),
            FailureKind::Status(status.as_u16()),
            format!("API error {status}: {body}"),
        ));
    }

    let bytes = match signal.guard(response.bytes()).await {
        None => return Err(ProviderFailure::cancelled(provider.clone())),
        Some(Err(e)) => {
            return Err(ProviderFailure::new(
                provider.clone(),
                FailureKind::Transport,
                format!("failed to read body: {e}"),
            ));
        }
        Some(Ok(bytes)) => bytes,
    };

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::warn!(%e, %provider, payload_bytes = bytes.len(), "Invalid lookup payload");
        ProviderFailure::new(provider.clone(), FailureKind::Decode, format!("invalid JSON payload: {e}"))
    })
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
