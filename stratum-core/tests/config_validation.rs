//! Construction-time validation of the configuration surface.

use std::time::Duration;

use rstest::rstest;
use stratum_core::{ConfigError, SyncConfig, SyncConfigBuilder, SyncOutcome};
use tokio::sync::mpsc;

fn complete(tx: mpsc::Sender<SyncOutcome>) -> SyncConfigBuilder {
    SyncConfig::builder()
        .with_target_url("https://authority.example.com/api/v1/component-strategies")
        .with_component("demo")
        .with_basic_auth("password")
        .with_interval_secs(60)
        .with_notify(tx)
}

#[test]
fn complete_configuration_builds() {
    let (tx, _rx) = mpsc::channel(3);
    let config = complete(tx).build().expect("valid config");
    assert_eq!(config.component().as_str(), "demo");
    assert_eq!(config.password(), "password");
    assert_eq!(config.interval(), Duration::from_secs(60));
    assert_eq!(
        config.target_url().as_str(),
        "https://authority.example.com/api/v1/component-strategies"
    );
}

#[test]
fn missing_notify_channel_fails() {
    let err = SyncConfig::builder()
        .with_target_url("https://authority.example.com/sync")
        .with_component("demo")
        .with_basic_auth("password")
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingNotifyChannel), "got: {err}");
    assert_eq!(err.to_string(), "notify channel is required");
}

#[test]
fn missing_target_url_fails() {
    let (tx, _rx) = mpsc::channel(1);
    let err = SyncConfig::builder()
        .with_component("demo")
        .with_basic_auth("password")
        .with_notify(tx)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingTargetUrl), "got: {err}");
}

#[rstest]
#[case::not_a_url("not a url")]
#[case::relative("/api/v1/component-strategies")]
#[case::ftp_scheme("ftp://authority.example.com/strategies")]
#[case::no_host("http://")]
fn malformed_target_url_fails(#[case] url: &str) {
    let (tx, _rx) = mpsc::channel(1);
    let err = complete(tx).with_target_url(url).build().unwrap_err();
    assert!(
        matches!(err, ConfigError::InvalidTargetUrl { .. }),
        "{url:?} should be rejected, got: {err}"
    );
}

#[rstest]
#[case::empty_password(complete_with(|b| b.with_basic_auth("")), "basic auth")]
#[case::empty_component(complete_with(|b| b.with_component("")), "component")]
#[case::blank_component(complete_with(|b| b.with_component("   ")), "component")]
#[case::zero_interval(complete_with(|b| b.with_interval_secs(0)), "interval")]
#[case::zero_timeout(complete_with(|b| b.with_timeout(Duration::ZERO)), "timeout")]
fn invalid_option_fails(#[case] result: Result<SyncConfig, ConfigError>, #[case] needle: &str) {
    let err = result.unwrap_err();
    assert!(err.to_string().contains(needle), "expected '{needle}' in: {err}");
}

fn complete_with(
    tweak: impl FnOnce(SyncConfigBuilder) -> SyncConfigBuilder,
) -> Result<SyncConfig, ConfigError> {
    let (tx, _rx) = mpsc::channel(1);
    tweak(complete(tx)).build()
}

#[test]
fn missing_password_fails() {
    let (tx, _rx) = mpsc::channel(1);
    let err = SyncConfig::builder()
        .with_target_url("https://authority.example.com/sync")
        .with_component("demo")
        .with_notify(tx)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingCredentials), "got: {err}");
}

#[test]
fn cache_path_override_is_kept() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let path = dir.path().join("strategies.json");
    let (tx, _rx) = mpsc::channel(1);
    let config = complete(tx)
        .with_cache_path(&path)
        .build()
        .expect("valid config");
    assert_eq!(config.cache_path(), path.as_path());
}
