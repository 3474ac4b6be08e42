//! Registry configuration
//!
//! Loaded once at startup from YAML, with credentials optionally supplied
//! from the environment. `validate` rejects anything that would otherwise
//! fail at the first call, so configuration errors are fatal up front.

use crate::retry::RetryPolicy;
use crate::schema::SourceId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const JUDILIBRE_BASE_URL: &str = "https://api.piste.gouv.fr/cassation/judilibre/v1.0";
pub const JUDILIBRE_DECISION_URL: &str = "https://www.courdecassation.fr/decision/";
pub const LEGIFRANCE_BASE_URL: &str =
    "https://api.aife.economie.gouv.fr/dila/legifrance-beta/lf-engine-app";
pub const LEGIFRANCE_OAUTH_URL: &str = "https://oauth.aife.economie.gouv.fr/api/oauth/token";
pub const LEGIFRANCE_DECISION_URL: &str = "https://www.legifrance.gouv.fr/juri/id/";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("{registry}: missing credential `{field}`")]
    MissingCredential {
        registry: SourceId,
        field: &'static str,
    },
    #[error("{registry}: invalid {field} `{url}`: {source}")]
    InvalidUrl {
        registry: SourceId,
        field: &'static str,
        url: String,
        source: url::ParseError,
    },
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    #[error("{0} is configured more than once")]
    DuplicateRegistry(SourceId),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Backoff settings as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// Judilibre: fixed API key sent in a header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudilibreConfig {
    pub enabled: bool,
    pub base_url: String,
    pub decision_url: String,
    pub api_key: String,
    /// Send a date range covering the cited year
    pub filter_by_year: bool,
}

impl Default for JudilibreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: JUDILIBRE_BASE_URL.to_string(),
            decision_url: JUDILIBRE_DECISION_URL.to_string(),
            api_key: String::new(),
            filter_by_year: false,
        }
    }
}

impl JudilibreConfig {
    pub fn search_url(&self) -> Result<Url, ConfigError> {
        endpoint(SourceId::Judilibre, "base_url", &self.base_url, "search")
    }
}

/// Légifrance: OAuth2 client credentials exchanged for a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegifranceConfig {
    pub enabled: bool,
    pub base_url: String,
    pub oauth_url: String,
    pub decision_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

impl Default for LegifranceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: LEGIFRANCE_BASE_URL.to_string(),
            oauth_url: LEGIFRANCE_OAUTH_URL.to_string(),
            decision_url: LEGIFRANCE_DECISION_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            scope: "openid".to_string(),
        }
    }
}

impl LegifranceConfig {
    pub fn search_url(&self) -> Result<Url, ConfigError> {
        endpoint(SourceId::Legifrance, "base_url", &self.base_url, "search")
    }

    pub fn token_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.oauth_url).map_err(|source| ConfigError::InvalidUrl {
            registry: SourceId::Legifrance,
            field: "oauth_url",
            url: self.oauth_url.clone(),
            source,
        })
    }
}

/// One registry entry; list order is the merge priority
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RegistryConfig {
    Judilibre(JudilibreConfig),
    Legifrance(LegifranceConfig),
}

impl RegistryConfig {
    pub fn source(&self) -> SourceId {
        match self {
            RegistryConfig::Judilibre(_) => SourceId::Judilibre,
            RegistryConfig::Legifrance(_) => SourceId::Legifrance,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            RegistryConfig::Judilibre(c) => c.enabled,
            RegistryConfig::Legifrance(c) => c.enabled,
        }
    }
}

/// Credentials taken from flags or the environment, overriding the file
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub judilibre_api_key: Option<String>,
    pub legifrance_client_id: Option<String>,
    pub legifrance_client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    /// Candidates verified concurrently per wave
    pub batch_size: usize,
    /// Hard deadline per HTTP call
    pub timeout_ms: u64,
    pub retry: RetrySettings,
    /// Confidence of a match whose registry gives no score
    pub default_confidence: f64,
    pub registries: Vec<RegistryConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            cache_capacity: 1000,
            batch_size: 5,
            timeout_ms: 30_000,
            retry: RetrySettings::default(),
            default_confidence: 0.8,
            registries: vec![
                RegistryConfig::Judilibre(JudilibreConfig::default()),
                RegistryConfig::Legifrance(LegifranceConfig::default()),
            ],
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml(&yaml)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Replace credentials with any non-empty override
    pub fn apply_credentials(&mut self, overrides: &CredentialOverrides) {
        let pick = |value: &Option<String>| value.as_ref().filter(|v| !v.trim().is_empty()).cloned();

        for registry in &mut self.registries {
            match registry {
                RegistryConfig::Judilibre(c) => {
                    if let Some(key) = pick(&overrides.judilibre_api_key) {
                        c.api_key = key;
                    }
                }
                RegistryConfig::Legifrance(c) => {
                    if let Some(id) = pick(&overrides.legifrance_client_id) {
                        c.client_id = id;
                    }
                    if let Some(secret) = pick(&overrides.legifrance_client_secret) {
                        c.client_secret = secret;
                    }
                }
            }
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Enabled registries in configured order
    pub fn enabled_registries(&self) -> impl Iterator<Item = &RegistryConfig> {
        self.registries.iter().filter(|r| r.enabled())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidSetting("batch_size must be at least 1".into()));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::InvalidSetting("cache_capacity must be at least 1".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidSetting("timeout_ms must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidSetting("retry.max_attempts must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err(ConfigError::InvalidSetting(
                "default_confidence must be between 0 and 1".into(),
            ));
        }

        let mut seen = HashSet::new();
        for registry in &self.registries {
            if !seen.insert(registry.source()) {
                return Err(ConfigError::DuplicateRegistry(registry.source()));
            }
        }

        for registry in self.enabled_registries() {
            match registry {
                RegistryConfig::Judilibre(c) => {
                    c.search_url()?;
                    require(SourceId::Judilibre, "api_key", &c.api_key)?;
                }
                RegistryConfig::Legifrance(c) => {
                    c.search_url()?;
                    c.token_url()?;
                    require(SourceId::Legifrance, "client_id", &c.client_id)?;
                    require(SourceId::Legifrance, "client_secret", &c.client_secret)?;
                }
            }
        }
        Ok(())
    }
}

fn require(registry: SourceId, field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingCredential { registry, field })
    } else {
        Ok(())
    }
}

/// `{base}/{path}` with exactly one slash between them
fn endpoint(registry: SourceId, field: &'static str, base: &str, path: &str) -> Result<Url, ConfigError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl {
        registry,
        field,
        url: base.to_string(),
        source,
    })
}
