use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::principal::StandardPrincipal;

/// Default deployer of every mega-dao contract.
pub const DEFAULT_DEPLOYER: &str = "SP3D6PV2ACBPEKYJTCMH7HEN02KP87QSP8KTEH335";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown network: {0:?}")]
    UnknownNetwork(String),

    #[error("invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("invalid deployer address {address}: {reason}")]
    InvalidDeployer { address: String, reason: String },

    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }

    /// Public Hiro API endpoint for this network.
    pub fn default_api_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.hiro.so",
            Self::Testnet => "https://api.testnet.hiro.so",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }
}

/// Settings for a client instance. Every field has a default, so a partial
/// TOML file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub network: Network,
    /// Overrides the network's default API endpoint.
    pub api_url: Option<String>,
    /// Deployer of the dao, vault, submission and voting contracts.
    pub deployer: String,
    /// Deployer of the token contract.
    pub token_deployer: String,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            api_url: None,
            deployer: DEFAULT_DEPLOYER.to_string(),
            token_deployer: DEFAULT_DEPLOYER.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn for_network(network: Network) -> Self {
        Self { network, ..Self::default() }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// The endpoint to talk to, validated and without a trailing `/`.
    pub fn resolved_api_url(&self) -> Result<String, ConfigError> {
        let url = self
            .api_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_api_url());
        if !validate_url(url) {
            return Err(ConfigError::InvalidUrl(url.to_string()));
        }
        Ok(url.trim_end_matches('/').to_string())
    }

    pub fn deployer_principal(&self) -> Result<StandardPrincipal, ConfigError> {
        parse_deployer(&self.deployer)
    }

    pub fn token_deployer_principal(&self) -> Result<StandardPrincipal, ConfigError> {
        parse_deployer(&self.token_deployer)
    }

    /// Check every field without building a client.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolved_api_url()?;
        self.deployer_principal()?;
        self.token_deployer_principal()?;
        Ok(())
    }

    /// `~/.mega`
    pub fn base_dir() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".mega"))
    }

    /// `~/.mega/config.toml`
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// `~/.mega/logs`
    pub fn logs_dir() -> Result<PathBuf, ConfigError> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Load from the default path, falling back to defaults if it is absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(&Self::config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_deployer(address: &str) -> Result<StandardPrincipal, ConfigError> {
    address.parse().map_err(|e: crate::principal::PrincipalError| ConfigError::InvalidDeployer {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_defaults() {
        assert_eq!(Network::Mainnet.default_api_url(), "https://api.hiro.so");
        assert_eq!(Network::Testnet.default_api_url(), "https://api.testnet.hiro.so");
        assert_eq!(ClientConfig::default().network, Network::Mainnet);
    }

    #[test]
    fn unknown_network_is_rejected() {
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
        match "devnet".parse::<Network>() {
            Err(ConfigError::UnknownNetwork(name)) => assert_eq!(name, "devnet"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn api_url_override_is_validated() {
        let config = ClientConfig::for_network(Network::Testnet);
        assert_eq!(config.resolved_api_url().unwrap(), "https://api.testnet.hiro.so");

        let config = config.with_api_url("http://localhost:3999/");
        assert_eq!(config.resolved_api_url().unwrap(), "http://localhost:3999");

        let bad = ClientConfig::default().with_api_url("ftp://files.example.com");
        assert!(matches!(bad.resolved_api_url(), Err(ConfigError::InvalidUrl(_))));
        assert!(!validate_url("not-a-url"));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str("network = \"testnet\"").unwrap();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.deployer, DEFAULT_DEPLOYER);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.api_url.is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let config = ClientConfig::for_network(Network::Testnet).with_api_url("http://localhost:3999");
        config.save_to_path(&path).unwrap();

        let loaded = ClientConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded = ClientConfig::load_from_path(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, ClientConfig::default());
    }

    #[test]
    fn bad_deployer_fails_validation() {
        let config = ClientConfig {
            deployer: "SP3D6PV2ACBPEKYJTCMH7HEN02KP87QSP8KTEH336".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDeployer { .. })));
    }
}
