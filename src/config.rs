//! Configuration management for ForgeChain

use crate::crypto::{address_from_hex, address_from_string, Address};
use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub genesis: GenesisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Difficulty of the genesis block, and of any block without history.
    pub genesis_difficulty: f64,
    /// Floor applied after every retarget.
    pub min_difficulty: f64,
    pub target_block_time_ms: u64,
    /// Number of past block intervals the retarget looks at.
    pub retarget_window: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            genesis_difficulty: 1.0,
            min_difficulty: 1.0,
            target_block_time_ms: 10_000,
            retarget_window: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    pub beneficiary_address: String,
    pub timestamp: u64,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            beneficiary_address: hex::encode(address_from_string("forgechain genesis")),
            timestamp: 1672531200000,
        }
    }
}

impl GenesisConfig {
    pub fn beneficiary(&self) -> Result<Address, ChainError> {
        address_from_hex(&self.beneficiary_address)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<tracing::Level, ChainError> {
        self.level
            .parse()
            .map_err(|_| ChainError::Config(format!("unknown log level '{}'", self.level)))
    }
}

impl Config {
    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ChainError> {
        let consensus = &self.consensus;
        for (name, value) in [
            ("consensus.genesis_difficulty", consensus.genesis_difficulty),
            ("consensus.min_difficulty", consensus.min_difficulty),
        ] {
            if !value.is_finite() || value < 1.0 {
                return Err(ChainError::Config(format!(
                    "{} must be a finite number >= 1.0, got {}",
                    name, value
                )));
            }
        }
        if consensus.target_block_time_ms == 0 {
            return Err(ChainError::Config(
                "consensus.target_block_time_ms must be positive".to_string(),
            ));
        }
        if consensus.retarget_window == 0 {
            return Err(ChainError::Config(
                "consensus.retarget_window must be at least 1".to_string(),
            ));
        }

        self.genesis.beneficiary()?;
        self.logging.level()?;
        Ok(())
    }
}

/// Loads `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<Config, ChainError> {
    let config: Config = match fs::read_to_string(path) {
        Ok(config_str) => toml::from_str(&config_str)?,
        Err(e) if e.kind() == ErrorKind::NotFound => Config::default(),
        Err(e) => return Err(e.into()),
    };

    config.validate()?;
    Ok(config)
}
