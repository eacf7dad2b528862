use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use sonance_core::crypto::KdfParams;
use sonance_core::error::{Result, WalletError};
use sonance_core::{ExpiryPolicy, StoreConfig};
use sonance_link::sweeper::DEFAULT_SWEEP_INTERVAL;
use sonance_link::LinkConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfProfile {
    Testing,
    #[default]
    Default,
    High,
}

impl KdfProfile {
    pub fn params(self) -> KdfParams {
        match self {
            Self::Testing => KdfParams::TESTING,
            Self::Default => KdfParams::DEFAULT,
            Self::High => KdfParams::HIGH,
        }
    }
}

impl std::fmt::Display for KdfProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Testing => "testing",
            Self::Default => "default",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        f.write_str(s)
    }
}

fn deserialize_path<'de, D>(deserializer: D) -> std::result::Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
        .map(|opt| opt.map(|s| PathBuf::from(shellexpand::tilde(&s).as_ref())))
}

fn deserialize_http_url<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    if let Some(url) = &opt {
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(serde::de::Error::custom(format!(
                "Invalid URL: '{}'. Must start with https:// or http://",
                url
            )));
        }
    }
    Ok(opt)
}

fn deserialize_interval<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<u64>::deserialize(deserializer)?;
    if opt == Some(0) {
        return Err(serde::de::Error::custom(
            "sweep_interval_secs must be greater than 0",
        ));
    }
    Ok(opt)
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

/// The `[link]` table: settings for `sonance serve`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkSettings {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default, deserialize_with = "deserialize_http_url")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub expose_links: bool,
    #[serde(default)]
    pub mail_from: Option<String>,
    #[serde(default, deserialize_with = "deserialize_http_url")]
    pub mail_api_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_interval")]
    pub sweep_interval_secs: Option<u64>,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_url: None,
            expose_links: false,
            mail_from: None,
            mail_api_url: None,
            sweep_interval_secs: None,
        }
    }
}

impl LinkSettings {
    pub fn link_config(&self) -> LinkConfig {
        let defaults = LinkConfig::default();
        LinkConfig {
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
            expose_links: self.expose_links,
            mail_from: self.mail_from.clone().unwrap_or(defaults.mail_from),
            ttl: defaults.ttl,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, deserialize_with = "deserialize_path")]
    pub store_path: Option<PathBuf>,
    #[serde(default)]
    pub kdf_profile: KdfProfile,
    /// Fallback filter when `RUST_LOG` is unset.
    #[serde(default)]
    pub log_level: Option<LogLevel>,
    #[serde(default)]
    pub expiry_policy: ExpiryPolicy,
    #[serde(default)]
    pub link: LinkSettings,
}

impl Config {
    /// Reads `path`, or the default location. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        const MAX_CONFIG_SIZE: u64 = 1024 * 1024;
        let metadata = std::fs::metadata(path).map_err(|e| {
            WalletError::InvalidConfig(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(WalletError::InvalidConfig("Config file too large".into()));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            WalletError::InvalidConfig(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| WalletError::InvalidConfig(e.to_string()))
    }

    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("sonance").join("config.toml"))
            .ok_or_else(|| WalletError::InvalidConfig("no config directory on this system".into()))
    }

    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(sonance_core::default_store_path)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default()
            .with_kdf(self.kdf_profile.params())
            .with_expiry_policy(self.expiry_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let content = r#"
store_path = "~/.sonance/wallet.db"
kdf_profile = "high"
log_level = "debug"
expiry_policy = "session-timeout"

[link]
bind = "0.0.0.0:8080"
base_url = "https://sonance.example"
expose_links = true
mail_from = "Sonance <hello@sonance.example>"
mail_api_url = "https://mail.example/emails"
sweep_interval_secs = 60
"#;
        let config = Config::parse(content).unwrap();
        assert!(config.store_path.is_some());
        assert_eq!(config.kdf_profile, KdfProfile::High);
        assert_eq!(config.log_level, Some(LogLevel::Debug));
        assert_eq!(config.expiry_policy, ExpiryPolicy::SessionTimeout);
        assert_eq!(config.link.bind.port(), 8080);
        assert!(config.link.expose_links);
        assert_eq!(config.link.sweep_interval(), Duration::from_secs(60));

        let link = config.link.link_config();
        assert_eq!(link.base_url, "https://sonance.example");
        assert!(link.validate().is_ok());
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.kdf_profile, KdfProfile::Default);
        assert_eq!(config.log_level, None);
        assert_eq!(config.expiry_policy, ExpiryPolicy::Fixed);
        assert_eq!(config.link.bind, default_bind());
        assert!(!config.link.expose_links);
        assert_eq!(config.link.sweep_interval(), DEFAULT_SWEEP_INTERVAL);
        assert_eq!(config.store_config().kdf, KdfParams::DEFAULT);
    }

    #[test]
    fn test_parse_partial_config() {
        let config = Config::parse("kdf_profile = \"testing\"\n").unwrap();
        assert_eq!(config.kdf_profile, KdfProfile::Testing);
        assert_eq!(config.store_config().kdf, KdfParams::TESTING);
        assert!(config.store_path.is_none());
    }

    #[test]
    fn test_invalid_base_url() {
        let content = r#"
[link]
base_url = "ftp://sonance.example"
"#;
        assert!(Config::parse(content).is_err());
    }

    #[test]
    fn test_invalid_kdf_profile() {
        assert!(Config::parse("kdf_profile = \"extreme\"\n").is_err());
    }

    #[test]
    fn test_invalid_expiry_policy() {
        assert!(Config::parse("expiry_policy = \"never\"\n").is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Config::parse("unknown_field = \"value\"\n").is_err());
        assert!(Config::parse("[link]\nport = 3000\n").is_err());
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        assert!(Config::parse("[link]\nsweep_interval_secs = 0\n").is_err());
    }

    #[test]
    fn test_tilde_expansion() {
        let config = Config::parse("store_path = \"~/custom/wallet.db\"\n").unwrap();
        let path = config.store_path.unwrap();
        assert!(!path.to_string_lossy().contains('~'));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.kdf_profile, KdfProfile::Default);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "kdf_profile = \"testing\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.kdf_profile, KdfProfile::Testing);
    }
}
