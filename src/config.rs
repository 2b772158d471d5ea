use std::{fs, path::Path};

use anyhow::Context;
use log::debug;
use serde::Deserialize;

use crate::{
    session::{DEFAULT_PORT, DEFAULT_TIMEOUT},
    Seconds,
};

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// SMTP server to connect to
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Use implicit TLS (SMTPS), set to false for a plaintext connection
    #[serde(default = "default_use_ssl")]
    pub use_ssl: bool,

    /// How long to wait while connecting
    #[serde(default = "default_timeout")]
    pub timeout: Seconds,

    /// Login, also used as the sender address
    pub user: String,

    pub password: String,

    /// Name shown next to the sender address, defaults to the address
    pub sender_name: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_use_ssl() -> bool {
    true
}

fn default_timeout() -> Seconds {
    DEFAULT_TIMEOUT
}

impl Config {
    pub fn load_from(config_path: &Path) -> anyhow::Result<Config> {
        debug!("Loading Config from: {config_path:?}");
        let file_contents = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read contents of {config_path:?}"))?;
        let result = serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse contents of {config_path:?}"))?;
        Ok(result)
    }
}
