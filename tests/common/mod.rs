//! Shared test utilities and fixtures
//!
//! Scripted providers for coordinator tests and mock upstreams for the HTTP adapters.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lookout_core::{
    FailureKind, Provider, ProviderFailure, ProviderId, RaceSignal, ResultEnvelope, fields,
    provider_fn,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// What a scripted provider does once its delay has elapsed.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Succeed,
    Fail(FailureKind),
    /// Waits for cancellation and never answers.
    Stall,
    /// Sleeps through cancellation; only an abort stops it.
    IgnoreSignal,
}

/// Counts provider attempts that are still alive.
#[derive(Debug, Clone, Default)]
pub struct LiveCounter(Arc<AtomicUsize>);

impl LiveCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn enter(&self) -> LiveGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        LiveGuard(Arc::clone(&self.0))
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A provider that answers after `delay` according to `script`.
pub fn scripted(id: &'static str, delay: Duration, script: Script, live: &LiveCounter) -> Arc<dyn Provider> {
    let live = live.clone();
    Arc::new(provider_fn(id, move |query, signal: RaceSignal| {
        let guard = live.enter();
        async move {
            let _guard = guard;
            let provider = ProviderId::from_static(id);
            match script {
                Script::Succeed => {
                    if signal.guard(tokio::time::sleep(delay)).await.is_none() {
                        return Err(ProviderFailure::cancelled(provider));
                    }
                    Ok(ResultEnvelope::new(provider).with_field(fields::POSTAL_CODE, query.as_str()))
                }
                Script::Fail(kind) => {
                    if signal.guard(tokio::time::sleep(delay)).await.is_none() {
                        return Err(ProviderFailure::cancelled(provider));
                    }
                    Err(ProviderFailure::new(provider, kind, "scripted failure"))
                }
                Script::Stall => {
                    signal.cancelled().await;
                    Err(ProviderFailure::cancelled(provider))
                }
                Script::IgnoreSignal => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(ProviderFailure::new(provider, FailureKind::Transport, "woke up"))
                }
            }
        }
    }))
}

pub fn brasil_api_body(cep: &str) -> serde_json::Value {
    serde_json::json!({
        "cep": cep,
        "state": "SP",
        "city": "São Paulo",
        "neighborhood": "Barra Funda",
        "street": "Rua Vitorino Carmilo",
        "service": "open-cep"
    })
}

pub fn viacep_body(cep: &str) -> serde_json::Value {
    serde_json::json!({
        "cep": format!("{}-{}", &cep[..5], &cep[5..]),
        "logradouro": "Rua Vitorino Carmilo",
        "complemento": "",
        "bairro": "Barra Funda",
        "localidade": "São Paulo",
        "uf": "SP",
        "estado": "São Paulo",
        "ibge": "3550308",
        "ddd": "11"
    })
}

/// Mount a BrasilAPI answer for `cep` after `delay`.
pub async fn mount_brasil_api(server: &MockServer, cep: &str, status: u16, delay: Duration) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(brasil_api_body(cep))
    } else {
        ResponseTemplate::new(status).set_body_string("upstream error")
    };

    Mock::given(method("GET"))
        .and(path(format!("/api/cep/v1/{cep}")))
        .respond_with(template.set_delay(delay))
        .mount(server)
        .await;
}

/// Mount a ViaCEP answer for `cep` after `delay`.
pub async fn mount_viacep(server: &MockServer, cep: &str, status: u16, delay: Duration) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(viacep_body(cep))
    } else {
        ResponseTemplate::new(status).set_body_string("<h1>Erro</h1>")
    };

    Mock::given(method("GET"))
        .and(path(format!("/ws/{cep}/json/")))
        .respond_with(template.set_delay(delay))
        .mount(server)
        .await;
}
