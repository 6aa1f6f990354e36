//! Runtime configuration
//!
//! Every knob the engine recognizes is read exactly once into an immutable
//! [`ScoutConfig`], which is then handed to the cache, the provider clients
//! and the researcher. Nothing below the config layer reads the process
//! environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::config_error;
use crate::error::{DomainScoutError, Result};

/// A credential value whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(***)")
    }
}

/// Settings shared by every provider client.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub enabled: bool,
    pub base_url: String,
    /// Sustained requests per second; zero or less disables limiting.
    pub rate_per_sec: f64,
    pub burst: u32,
    pub timeout: Duration,
}

impl ProviderSettings {
    pub fn new(base_url: impl Into<String>, rate_per_sec: f64, burst: u32) -> Self {
        Self {
            enabled: true,
            base_url: base_url.into(),
            rate_per_sec,
            burst,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_rate(mut self, rate_per_sec: f64, burst: u32) -> Self {
        self.rate_per_sec = rate_per_sec;
        self.burst = burst;
        self
    }
}

#[derive(Debug, Clone)]
pub struct NameComConfig {
    pub settings: ProviderSettings,
    pub username: Option<String>,
    pub api_token: Option<Secret>,
}

impl Default for NameComConfig {
    fn default() -> Self {
        Self {
            settings: ProviderSettings::new("https://api.dev.name.com/v4", 2.0, 2),
            username: None,
            api_token: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoDaddyConfig {
    pub settings: ProviderSettings,
    pub api_key: Option<Secret>,
    pub api_secret: Option<Secret>,
}

impl Default for GoDaddyConfig {
    fn default() -> Self {
        Self {
            settings: ProviderSettings::new("https://api.godaddy.com/v1", 1.0, 1),
            api_key: None,
            api_secret: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CloudflareConfig {
    pub settings: ProviderSettings,
    pub api_token: Option<Secret>,
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            settings: ProviderSettings::new("https://api.cloudflare.com/client/v4", 5.0, 5),
            api_token: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NamecheapConfig {
    pub settings: ProviderSettings,
    pub api_user: Option<String>,
    pub api_key: Option<Secret>,
    pub client_ip: String,
}

impl Default for NamecheapConfig {
    fn default() -> Self {
        Self {
            settings: ProviderSettings::new("https://api.namecheap.com/xml.response", 1.0, 1),
            api_user: None,
            api_key: None,
            client_ip: "127.0.0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DomainrConfig {
    pub settings: ProviderSettings,
    pub api_key: Option<Secret>,
}

impl Default for DomainrConfig {
    fn default() -> Self {
        Self {
            settings: ProviderSettings::new("https://api.domainr.com", 3.0, 5),
            api_key: None,
        }
    }
}

/// Bulk availability service; opt-in.
#[derive(Debug, Clone)]
pub struct FastCheckConfig {
    pub settings: ProviderSettings,
    pub api_key: Option<Secret>,
    pub batch_size: usize,
}

impl Default for FastCheckConfig {
    fn default() -> Self {
        Self {
            settings: ProviderSettings::new("http://localhost:8080/v1/domains/check", 3.0, 5)
                .with_timeout(Duration::from_secs(30))
                .disabled(),
            api_key: None,
            batch_size: 20,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub cache_path: PathBuf,
    /// Ceiling on live (non-cached) lookups for the lifetime of one researcher.
    pub max_calls: usize,
    /// Maximum domains resolved at the same time.
    pub concurrency: usize,
    /// Delays before each retry; the first attempt is always immediate.
    pub retry_backoff: Vec<Duration>,
    pub multi_registrar: bool,
    pub namecom: NameComConfig,
    pub godaddy: GoDaddyConfig,
    pub cloudflare: CloudflareConfig,
    pub namecheap: NamecheapConfig,
    pub domainr: DomainrConfig,
    pub fastcheck: FastCheckConfig,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("domain_cache.sqlite3"),
            max_calls: 80,
            concurrency: 10,
            retry_backoff: vec![
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
            ],
            multi_registrar: true,
            namecom: NameComConfig::default(),
            godaddy: GoDaddyConfig::default(),
            cloudflare: CloudflareConfig::default(),
            namecheap: NamecheapConfig::default(),
            domainr: DomainrConfig::default(),
            fastcheck: FastCheckConfig::default(),
        }
    }
}

impl ScoutConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let mut config = Self::default();

        if let Some(path) = env.string("DOMAIN_CACHE_PATH") {
            config.cache_path = PathBuf::from(path);
        }
        if let Some(max_calls) = env.parse::<usize>("DOMAIN_CHECK_MAX_CALLS")? {
            config.max_calls = max_calls;
        }
        if let Some(concurrency) = env.parse::<usize>("DOMAIN_CHECK_CONCURRENCY")? {
            if concurrency == 0 {
                return Err(DomainScoutError::config(
                    "DOMAIN_CHECK_CONCURRENCY must be at least 1",
                ));
            }
            config.concurrency = concurrency;
        }
        if let Some(raw) = env.string("DOMAIN_CHECK_RETRY_BACKOFF") {
            config.retry_backoff = parse_backoff(&raw)?;
        }
        if let Some(enabled) = env.flag("ENABLE_MULTI_REGISTRAR")? {
            config.multi_registrar = enabled;
        }

        env.settings(&mut config.namecom.settings, "ENABLE_NAMECOM", "NAMECOM", Some("NAME_COM_BASE"))?;
        config.namecom.username = env.string("NAME_COM_USERNAME");
        config.namecom.api_token = env.secret("NAME_COM_API_KEY");

        env.settings(&mut config.godaddy.settings, "ENABLE_GODADDY", "GODADDY", Some("GODADDY_BASE"))?;
        config.godaddy.api_key = env.secret("GODADDY_API_KEY");
        config.godaddy.api_secret = env.secret("GODADDY_API_SECRET");

        env.settings(&mut config.cloudflare.settings, "ENABLE_CLOUDFLARE", "CLOUDFLARE", Some("CLOUDFLARE_BASE"))?;
        config.cloudflare.api_token = env.secret("CLOUDFLARE_API_TOKEN");

        env.settings(&mut config.namecheap.settings, "ENABLE_NAMECHEAP", "NAMECHEAP", Some("NAMECHEAP_BASE"))?;
        config.namecheap.api_user = env.string("NAMECHEAP_API_USER");
        config.namecheap.api_key = env.secret("NAMECHEAP_API_KEY");
        if let Some(ip) = env.string("NAMECHEAP_CLIENT_IP") {
            config.namecheap.client_ip = ip;
        }

        env.settings(&mut config.domainr.settings, "ENABLE_DOMAINR", "DOMAINR", Some("DOMAINR_BASE"))?;
        config.domainr.api_key = env.secret("DOMAINR_API_KEY");

        env.settings(
            &mut config.fastcheck.settings,
            "MCP_FASTDOMAINCHECK_ENABLED",
            "MCP_FASTDOMAINCHECK",
            Some("MCP_FASTDOMAINCHECK_ENDPOINT"),
        )?;
        // The batch service has historically used a bare seconds key.
        if let Some(secs) = env.parse::<f64>("MCP_FASTDOMAINCHECK_TIMEOUT")? {
            config.fastcheck.settings.timeout = seconds("MCP_FASTDOMAINCHECK_TIMEOUT", secs)?;
        }
        config.fastcheck.api_key = env.secret("MCP_FASTDOMAINCHECK_API_KEY");
        if let Some(size) = env.parse::<usize>("MCP_BATCH_SIZE")? {
            if size == 0 {
                return Err(DomainScoutError::config("MCP_BATCH_SIZE must be at least 1"));
            }
            config.fastcheck.batch_size = size;
        }

        Ok(config)
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn secret(&self, key: &str) -> Option<Secret> {
        self.string(key).map(Secret::new)
    }

    fn parse<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.string(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| config_error!("Invalid value for {}: '{}'", key, raw)),
        }
    }

    fn flag(&self, key: &str) -> Result<Option<bool>> {
        match self.string(key) {
            None => Ok(None),
            Some(raw) => match raw.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(config_error!("Invalid boolean for {}: '{}'", key, raw)),
            },
        }
    }

    /// Apply the `<enable_key>`, `<PREFIX>_RPS`, `<PREFIX>_BURST`,
    /// `<PREFIX>_TIMEOUT_SECS` and base URL overrides.
    fn settings(
        &self,
        settings: &mut ProviderSettings,
        enable_key: &str,
        prefix: &str,
        base_key: Option<&str>,
    ) -> Result<()> {
        if let Some(enabled) = self.flag(enable_key)? {
            settings.enabled = enabled;
        }
        if let Some(rate) = self.parse::<f64>(&format!("{prefix}_RPS"))? {
            settings.rate_per_sec = rate;
        }
        if let Some(burst) = self.parse::<u32>(&format!("{prefix}_BURST"))? {
            settings.burst = burst;
        }
        let timeout_key = format!("{prefix}_TIMEOUT_SECS");
        if let Some(secs) = self.parse::<f64>(&timeout_key)? {
            settings.timeout = seconds(&timeout_key, secs)?;
        }
        if let Some(base) = base_key.and_then(|key| self.string(key)) {
            settings.base_url = base;
        }
        Ok(())
    }
}

fn seconds(key: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| config_error!("{} must be a non-negative number of seconds, got {}", key, secs))
}

/// Parse a comma-separated list of retry delays in seconds.
pub fn parse_backoff(raw: &str) -> Result<Vec<Duration>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let secs = s
                .parse::<f64>()
                .map_err(|_| config_error!("Invalid retry delay '{}' in DOMAIN_CHECK_RETRY_BACKOFF", s))?;
            seconds("DOMAIN_CHECK_RETRY_BACKOFF", secs)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ScoutConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ScoutConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.max_calls, 80);
        assert_eq!(config.cache_path, PathBuf::from("domain_cache.sqlite3"));
        assert!(config.multi_registrar);
        assert!(config.namecom.settings.enabled);
        assert!(!config.fastcheck.settings.enabled);
        assert_eq!(config.fastcheck.batch_size, 20);
        assert_eq!(config.retry_backoff.len(), 3);
        assert!(config.namecom.username.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DOMAIN_CACHE_PATH", "/tmp/scout.sqlite3"),
            ("DOMAIN_CHECK_MAX_CALLS", "5"),
            ("ENABLE_GODADDY", "0"),
            ("ENABLE_MULTI_REGISTRAR", "false"),
            ("NAME_COM_USERNAME", "alice"),
            ("NAME_COM_API_KEY", "token"),
            ("NAMECOM_RPS", "4.5"),
            ("NAMECOM_BURST", "3"),
            ("NAMECOM_TIMEOUT_SECS", "2.5"),
            ("MCP_FASTDOMAINCHECK_ENABLED", "1"),
            ("MCP_BATCH_SIZE", "50"),
            ("MCP_FASTDOMAINCHECK_TIMEOUT", "12"),
        ])
        .unwrap();

        assert_eq!(config.cache_path, PathBuf::from("/tmp/scout.sqlite3"));
        assert_eq!(config.max_calls, 5);
        assert!(!config.godaddy.settings.enabled);
        assert!(!config.multi_registrar);
        assert_eq!(config.namecom.username.as_deref(), Some("alice"));
        assert_eq!(config.namecom.api_token.as_ref().map(Secret::expose), Some("token"));
        assert_eq!(config.namecom.settings.rate_per_sec, 4.5);
        assert_eq!(config.namecom.settings.burst, 3);
        assert_eq!(config.namecom.settings.timeout, Duration::from_millis(2500));
        assert!(config.fastcheck.settings.enabled);
        assert_eq!(config.fastcheck.batch_size, 50);
        assert_eq!(config.fastcheck.settings.timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = config_from(&[("NAME_COM_USERNAME", "   "), ("DOMAIN_CHECK_MAX_CALLS", "")]).unwrap();
        assert!(config.namecom.username.is_none());
        assert_eq!(config.max_calls, 80);
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert!(config_from(&[("DOMAIN_CHECK_MAX_CALLS", "lots")]).is_err());
        assert!(config_from(&[("ENABLE_NAMECOM", "maybe")]).is_err());
        assert!(config_from(&[("MCP_BATCH_SIZE", "0")]).is_err());
        assert!(config_from(&[("GODADDY_TIMEOUT_SECS", "-1")]).is_err());
        assert!(config_from(&[("NAMECOM_TIMEOUT_SECS", "1e30")]).is_err());
        assert!(config_from(&[("NAMECOM_TIMEOUT_SECS", "NaN")]).is_err());
        assert!(config_from(&[("MCP_FASTDOMAINCHECK_TIMEOUT", "inf")]).is_err());
        assert!(config_from(&[("DOMAIN_CHECK_RETRY_BACKOFF", "0.5,1e300")]).is_err());
    }

    #[test]
    fn test_backoff_parsing() {
        let schedule = parse_backoff("0.25, 1,2").unwrap();
        assert_eq!(
            schedule,
            vec![
                Duration::from_millis(250),
                Duration::from_secs(1),
                Duration::from_secs(2)
            ]
        );
        assert!(parse_backoff("").unwrap().is_empty());
        assert!(parse_backoff("1,x").is_err());
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let config = config_from(&[("GODADDY_API_SECRET", "hunter2")]).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("Secret(***)"));
    }
}
