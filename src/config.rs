use std::path::PathBuf;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_PAGE_SIZE;
use crate::summarize::{DEFAULT_MAX_TOKENS, DEFAULT_MAX_TRANSCRIPT_CHARS, DEFAULT_MODEL};
use crate::workflow::DEFAULT_STARTING_CREDITS;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub default_user: Option<String>,
    pub lang: Option<String>,
    pub model: Option<String>,
    pub max_transcript_chars: Option<usize>,
    pub max_tokens: Option<u32>,
    pub starting_credits: Option<i64>,
    pub provision_missing_users: Option<bool>,
    pub data_dir: Option<PathBuf>,
    pub page_size: Option<usize>,
}

impl Config {
    /// Load config from ~/.config/ytsum/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    pub fn lang(&self) -> &str {
        self.lang.as_deref().unwrap_or("en")
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn max_transcript_chars(&self) -> usize {
        self.max_transcript_chars.unwrap_or(DEFAULT_MAX_TRANSCRIPT_CHARS)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn starting_credits(&self) -> i64 {
        self.starting_credits.unwrap_or(DEFAULT_STARTING_CREDITS)
    }

    pub fn provision_missing_users(&self) -> bool {
        self.provision_missing_users.unwrap_or(true)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.filter(|n| *n > 0).unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytsum")
        .join("config.toml")
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("ytsum")
}
