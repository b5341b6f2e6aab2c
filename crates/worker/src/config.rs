//! Worker configuration from environment variables.
//!
//! | Env Var                | Default                      |
//! |------------------------|------------------------------|
//! | `OPENAI_API_KEY`       | required for `run`/`generate`|
//! | `OPENAI_BASE_URL`      | `https://api.openai.com`     |
//! | `META_ACCESS_TOKEN`    | required for `run`/`check`   |
//! | `META_AD_ACCOUNT_ID`   | required for `run`/`check`   |
//! | `META_APP_SECRET`      | unset                        |
//! | `META_PAGE_ID`         | unset                        |
//! | `META_API_VERSION`     | `v21.0`                      |
//! | `META_GRAPH_URL`       | `https://graph.facebook.com` |
//! | `REQUEST_TIMEOUT_SECS` | `60`                         |
//! | `MAX_ATTEMPTS`         | `3`                          |
//! | `RETRY_BACKOFF_SECS`   | `5`                          |
//! | `IMAGES_DIR`           | `./generated_images`         |
//! | `LOGS_DIR`             | `./logs`                     |
//! | `BATCH_CONCURRENCY`    | `1`                          |
//!
//! Empty values and sample-file placeholders count as unset.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use adgen_adplatform::client::{DEFAULT_API_VERSION, DEFAULT_GRAPH_URL};
use adgen_adplatform::GraphConfig;
use adgen_core::account::{is_placeholder, mask_secret};
use adgen_core::error::CoreError;
use adgen_core::retry::{RetryPolicy, DEFAULT_BACKOFF_UNIT, DEFAULT_MAX_ATTEMPTS};
use adgen_imagegen::api::DEFAULT_BASE_URL;
use adgen_pipeline::{AutomationSettings, PublishOptions};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var}='{value}' is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[derive(Clone)]
pub struct WorkerConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub access_token: Option<String>,
    pub ad_account_id: Option<String>,
    pub app_secret: Option<String>,
    pub page_id: Option<String>,
    pub api_version: String,
    pub graph_url: String,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub images_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub batch_concurrency: usize,
}

impl WorkerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !is_placeholder(v));
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let default_settings = AutomationSettings::default();

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            access_token: get("META_ACCESS_TOKEN"),
            ad_account_id: get("META_AD_ACCOUNT_ID"),
            app_secret: get("META_APP_SECRET"),
            page_id: get("META_PAGE_ID"),
            api_version: or("META_API_VERSION", DEFAULT_API_VERSION),
            graph_url: or("META_GRAPH_URL", DEFAULT_GRAPH_URL),
            request_timeout: Duration::from_secs(parse(&get, "REQUEST_TIMEOUT_SECS", 60)?),
            max_attempts: parse(&get, "MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            retry_backoff: Duration::from_secs(parse(
                &get,
                "RETRY_BACKOFF_SECS",
                DEFAULT_BACKOFF_UNIT.as_secs(),
            )?),
            images_dir: get("IMAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or(default_settings.images_dir),
            logs_dir: get("LOGS_DIR")
                .map(PathBuf::from)
                .unwrap_or(default_settings.logs_dir),
            batch_concurrency: parse(&get, "BATCH_CONCURRENCY", 1usize)?.max(1),
        })
    }

    pub fn openai_api_key(&self) -> Result<&str, ConfigError> {
        self.openai_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))
    }

    /// Platform connection settings. Requires the access token and a
    /// well-formed ad account id.
    pub fn graph_config(&self) -> Result<GraphConfig, ConfigError> {
        let token = self
            .access_token
            .clone()
            .ok_or(ConfigError::Missing("META_ACCESS_TOKEN"))?;
        let account = self
            .ad_account_id
            .clone()
            .ok_or(ConfigError::Missing("META_AD_ACCOUNT_ID"))?;

        let mut config = GraphConfig::new(token, account)?;
        config.base_url = self.graph_url.clone();
        config.api_version = self.api_version.clone();
        config.app_secret = self.app_secret.clone();
        config.page_id = self.page_id.clone();
        config.request_timeout = self.request_timeout;
        Ok(config)
    }

    pub fn publish_options(&self) -> PublishOptions {
        PublishOptions {
            call_timeout: self.request_timeout,
            retry: RetryPolicy::new(self.max_attempts, self.retry_backoff),
        }
    }

    pub fn automation_settings(&self) -> AutomationSettings {
        AutomationSettings {
            images_dir: self.images_dir.clone(),
            logs_dir: self.logs_dir.clone(),
            batch_concurrency: self.batch_concurrency,
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let masked = |v: &Option<String>| v.as_deref().map(mask_secret);
        f.debug_struct("WorkerConfig")
            .field("openai_api_key", &masked(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("access_token", &masked(&self.access_token))
            .field("ad_account_id", &self.ad_account_id)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .field("page_id", &self.page_id)
            .field("api_version", &self.api_version)
            .field("graph_url", &self.graph_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff", &self.retry_backoff)
            .field("images_dir", &self.images_dir)
            .field("logs_dir", &self.logs_dir)
            .field("batch_concurrency", &self.batch_concurrency)
            .finish()
    }
}

fn parse<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
