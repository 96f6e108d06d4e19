//! Config files driving provider wiring.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use lookout_config::{ConfigError, LookoutConfig};
use lookout_core::{Provider, Query, Race};
use lookout_providers::{HttpSettings, ViaCep, http_client, viacep};
use wiremock::MockServer;

use crate::common::mount_viacep;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn configured_base_url_and_timeout_drive_a_race() {
    let server = MockServer::start().await;
    mount_viacep(&server, "01153000", 200, Duration::ZERO).await;

    let file = write_config(&format!(
        "[race]\ntimeout_ms = 2000\ngrace_ms = 50\n\n[http]\nhttps_only = false\n\n[providers.viacep]\nbase_url = \"{}\"\n",
        server.uri()
    ));
    let config = LookoutConfig::load_from(file.path()).unwrap();

    let settings = HttpSettings {
        connect_timeout: config.http.connect_timeout(),
        https_only: config.http.https_only,
        ..HttpSettings::default()
    };
    let client = http_client(&settings).unwrap();
    let base_url = config.provider(viacep::PROVIDER_ID).base_url.unwrap();
    let providers: Vec<Arc<dyn Provider>> = vec![Arc::new(ViaCep::new(client).with_base_url(base_url))];

    let report = Race::new(providers, config.race.timeout())
        .with_grace_period(config.race.grace_period())
        .run(Query::new("01153000").unwrap())
        .await;

    assert_eq!(report.outcome.winner().map(|w| w.provider().as_str()), Some("viacep"));
}

#[tokio::test]
async fn https_only_client_refuses_plain_http_upstream() {
    let server = MockServer::start().await;
    mount_viacep(&server, "01153000", 200, Duration::ZERO).await;

    let client = http_client(&HttpSettings::default()).unwrap();
    let providers: Vec<Arc<dyn Provider>> =
        vec![Arc::new(ViaCep::new(client).with_base_url(server.uri()))];

    let report = Race::new(providers, Duration::from_secs(2))
        .run(Query::new("01153000").unwrap())
        .await;

    assert_eq!(report.outcome, lookout_core::Outcome::AllFailed);
    assert_eq!(report.failures[0].kind(), lookout_core::FailureKind::Transport);
}

#[test]
fn malformed_file_reports_its_path() {
    let file = write_config("[race\ntimeout_ms = 1");
    let err = LookoutConfig::resolve(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}
