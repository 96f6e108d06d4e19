//! Lookout CLI - races every configured CEP provider and prints the first answer.
//!
//! # Architecture
//!
//! ```text
//! main() -> LookoutConfig::resolve() -> http_client() -> assemble_providers()
//!                                                              |
//!                                                              v
//!                                   Race::run(query) -> report::render_* -> ExitCode
//! ```
//!
//! Logs go to stderr (`RUST_LOG`, default `warn`) so stdout carries only the report.

mod report;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lookout_config::LookoutConfig;
use lookout_core::{Provider, Query, Race};
use lookout_providers::{
    BrasilApi, HttpSettings, RetryConfig, ViaCep, WithRetry, brasil_api, http_client, viacep,
};

const KNOWN_PROVIDERS: [&str; 2] = [brasil_api::PROVIDER_ID, viacep::PROVIDER_ID];

#[derive(Debug, Parser)]
#[command(name = "lookout")]
#[command(about = "Look up a Brazilian postal code (CEP) from redundant providers", long_about = None)]
#[command(version)]
struct Args {
    /// CEP to look up, e.g. 01153000 or 01153-000
    #[arg(default_value = "01153000")]
    cep: String,

    /// Overall deadline in milliseconds (overrides config and LOOKOUT_TIMEOUT_MS)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: Option<u64>,

    /// Race only these providers (repeatable): brasilapi, viacep
    #[arg(long = "provider", value_name = "ID")]
    providers: Vec<String>,

    /// Print the full race report as JSON
    #[arg(long)]
    json: bool,

    /// Config file to use instead of ~/.lookout/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(report::EXIT_SETUP)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut config = LookoutConfig::resolve(args.config.as_deref())?;
    if let Some(ms) = args.timeout_ms {
        config.race.timeout_ms = ms;
    }

    let query = Query::new(&args.cep)?;
    let providers = assemble_providers(&config, &args.providers)?;
    let timeout = config.race.timeout();

    tracing::debug!(
        query = %query,
        providers = providers.len(),
        timeout_ms = config.race.timeout_ms,
        "Starting lookup"
    );

    let report = Race::new(providers, timeout)
        .with_grace_period(config.race.grace_period())
        .run(query)
        .await;

    if args.json {
        println!("{}", report::render_json(&report).context("failed to encode report")?);
    } else {
        print!("{}", report::render_text(&report, timeout));
    }

    Ok(report::exit_code(&report.outcome))
}

/// Builds the providers to race. An explicit `--provider` list wins over the
/// `enabled` flags in the config file.
fn assemble_providers(config: &LookoutConfig, selected: &[String]) -> Result<Vec<Arc<dyn Provider>>> {
    if let Some(unknown) = selected.iter().find(|id| !KNOWN_PROVIDERS.contains(&id.as_str())) {
        bail!(
            "unknown provider `{unknown}` (known: {})",
            KNOWN_PROVIDERS.join(", ")
        );
    }

    let wanted = |id: &str| {
        if selected.is_empty() {
            config.provider(id).enabled
        } else {
            selected.iter().any(|s| s == id)
        }
    };

    let mut settings = HttpSettings {
        connect_timeout: config.http.connect_timeout(),
        https_only: config.http.https_only,
        ..HttpSettings::default()
    };
    if let Some(agent) = &config.http.user_agent {
        settings.user_agent.clone_from(agent);
    }
    let client = http_client(&settings)?;

    let mut providers = Vec::new();
    if wanted(brasil_api::PROVIDER_ID) {
        let mut provider = BrasilApi::new(client.clone());
        if let Some(url) = config.provider(brasil_api::PROVIDER_ID).base_url {
            provider = provider.with_base_url(url);
        }
        providers.push(with_retry(provider, config));
    }
    if wanted(viacep::PROVIDER_ID) {
        let mut provider = ViaCep::new(client);
        if let Some(url) = config.provider(viacep::PROVIDER_ID).base_url {
            provider = provider.with_base_url(url);
        }
        providers.push(with_retry(provider, config));
    }

    if providers.is_empty() {
        bail!("no providers enabled; enable one in the config or pass --provider");
    }
    Ok(providers)
}

fn with_retry<P: Provider + 'static>(provider: P, config: &LookoutConfig) -> Arc<dyn Provider> {
    if !config.retry.is_enabled() {
        return Arc::new(provider);
    }
    let retry = RetryConfig {
        max_retries: config.retry.max_retries,
        initial_delay: config.retry.initial_delay(),
        max_delay: config.retry.max_delay(),
        ..RetryConfig::default()
    };
    Arc::new(WithRetry::new(provider, retry))
}
