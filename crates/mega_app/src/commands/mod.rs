//! CLI subcommand implementations.

use std::path::PathBuf;

use anyhow::{Context, Result};
use mega_client::MegaClient;
use mega_core::ClientConfig;
use serde::Serialize;

pub mod query;
pub mod transfer;
pub mod vote;

/// Global flags shared by every subcommand.
#[derive(Debug, Default)]
pub struct Settings {
    pub network: Option<String>,
    pub api_url: Option<String>,
    pub config_path: Option<PathBuf>,
}

impl Settings {
    fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => ClientConfig::config_path().context("Could not resolve config path"),
        }
    }

    /// File config with command-line overrides applied.
    pub fn load_config(&self) -> Result<ClientConfig> {
        let path = self.config_path()?;
        let mut config = ClientConfig::load_from_path(&path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?;
        if let Some(network) = &self.network {
            config.network = network.parse()?;
        }
        if let Some(url) = &self.api_url {
            config.api_url = Some(url.clone());
        }
        config.validate()?;
        Ok(config)
    }

    pub fn client(&self) -> Result<MegaClient> {
        Ok(MegaClient::new(self.load_config()?)?)
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `mega config`
pub fn show_config(settings: &Settings, save: bool) -> Result<()> {
    let config = settings.load_config()?;
    if save {
        let path = settings.config_path()?;
        config
            .save_to_path(&path)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        eprintln!("Saved to {}", path.display());
    }
    print_json(&config)
}
