//! Engine configuration.
//!
//! A [`SyncConfig`] is produced only by [`SyncConfigBuilder::build`], which
//! validates every option up front. Once built it is never mutated.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use url::Url;

use crate::error::ConfigError;
use crate::types::{ComponentName, SyncOutcome};

/// Produces the tag sent as `hostname` in every request.
pub type TagFn = Arc<dyn Fn() -> String + Send + Sync>;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CACHE_FILE: &str = "stratum-strategies.json";

/// Validated, immutable engine configuration.
#[derive(Clone)]
pub struct SyncConfig {
    target_url: Url,
    component: ComponentName,
    password: String,
    interval: Duration,
    timeout: Duration,
    tag_fn: TagFn,
    cache_path: PathBuf,
    notify: mpsc::Sender<SyncOutcome>,
}

impl SyncConfig {
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    pub fn target_url(&self) -> &Url {
        &self.target_url
    }

    pub fn component(&self) -> &ComponentName {
        &self.component
    }

    /// Basic-auth secret. The identity half is the component name.
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Evaluate the tag function.
    pub fn tag(&self) -> String {
        (self.tag_fn)()
    }

    pub fn tag_fn(&self) -> TagFn {
        self.tag_fn.clone()
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn notify(&self) -> &mpsc::Sender<SyncOutcome> {
        &self.notify
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("target_url", &self.target_url.as_str())
            .field("component", &self.component)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("cache_path", &self.cache_path)
            .finish_non_exhaustive()
    }
}

/// Collects options for a [`SyncConfig`]; nothing is checked until [`build`](Self::build).
#[derive(Default)]
pub struct SyncConfigBuilder {
    target_url: Option<String>,
    component: Option<ComponentName>,
    password: Option<String>,
    interval: Option<Duration>,
    timeout: Option<Duration>,
    tag_fn: Option<TagFn>,
    cache_path: Option<PathBuf>,
    notify: Option<mpsc::Sender<SyncOutcome>>,
}

impl SyncConfigBuilder {
    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<ComponentName>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_basic_auth(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_interval_secs(self, secs: u64) -> Self {
        self.with_interval(Duration::from_secs(secs))
    }

    /// Sub-second intervals are accepted; tests rely on them.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_tag_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.tag_fn = Some(Arc::new(f));
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn with_notify(mut self, notify: mpsc::Sender<SyncOutcome>) -> Self {
        self.notify = Some(notify);
        self
    }

    /// Validate every option and freeze the configuration.
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let raw_url = self.target_url.ok_or(ConfigError::MissingTargetUrl)?;
        let target_url = parse_target_url(&raw_url)?;

        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingCredentials)?;

        let component = self
            .component
            .filter(|c| !c.0.trim().is_empty())
            .ok_or(ConfigError::MissingComponent)?;

        let interval = self.interval.unwrap_or(DEFAULT_INTERVAL);
        if interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }

        let notify = self.notify.ok_or(ConfigError::MissingNotifyChannel)?;

        Ok(SyncConfig {
            target_url,
            component,
            password,
            interval,
            timeout,
            tag_fn: self.tag_fn.unwrap_or_else(|| Arc::new(local_hostname)),
            cache_path: self.cache_path.unwrap_or_else(default_cache_path),
            notify,
        })
    }
}

fn parse_target_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidTargetUrl {
        url: raw.to_string(),
        reason,
    };
    if raw.trim().is_empty() {
        return Err(ConfigError::MissingTargetUrl);
    }
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// `<temp dir>/stratum-strategies.json`
pub fn default_cache_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_CACHE_FILE)
}

/// Best-effort local host name, used as the default tag.
pub fn local_hostname() -> String {
    if let Ok(name) = std::env::var("HOSTNAME") {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    for path in ["/proc/sys/kernel/hostname", "/etc/hostname"] {
        if let Ok(contents) = std::fs::read_to_string(path) {
            let name = contents.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }
    "localhost".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> (SyncConfigBuilder, mpsc::Receiver<SyncOutcome>) {
        let (tx, rx) = mpsc::channel(4);
        let builder = SyncConfig::builder()
            .with_target_url("http://config.example.com/api/v1/component-strategies")
            .with_component("gateway")
            .with_basic_auth("s3cret")
            .with_notify(tx);
        (builder, rx)
    }

    #[test]
    fn defaults_applied() {
        let (builder, _rx) = valid();
        let config = builder.build().unwrap();
        assert_eq!(config.interval(), DEFAULT_INTERVAL);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.cache_path(), default_cache_path());
        assert!(!config.tag().is_empty());
    }

    #[test]
    fn custom_tag_fn_is_used() {
        let (builder, _rx) = valid();
        let config = builder.with_tag_fn(|| "edge-7".to_string()).build().unwrap();
        assert_eq!(config.tag(), "edge-7");
    }

    #[test]
    fn relative_url_rejected() {
        let (builder, _rx) = valid();
        let err = builder.with_target_url("/api/v1").build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTargetUrl { .. }), "got: {err}");
    }

    #[test]
    fn debug_output_hides_password() {
        let (builder, _rx) = valid();
        let config = builder.build().unwrap();
        let rendered = format!("{config:?}");
        assert!(rendered.contains("gateway"));
        assert!(!rendered.contains("s3cret"));
    }
}
