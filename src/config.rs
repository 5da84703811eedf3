use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::assignment::{ExclusiveGreedy, GreedyPerTrack};
use crate::comparison::{Thresholds, DEFAULT_HIGH_CONFIDENCE_FLOOR, DEFAULT_LOW_RELEVANCE_FLOOR};
use crate::error::ConfigError;
use crate::group_matcher::MatchSettings;
use crate::musicbrainz::{DEFAULT_BASE_URL, DEFAULT_SEARCH_LIMIT, DEFAULT_USER_AGENT};

pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_WORKERS: usize = 4;

/// Configuration defaults that can be saved to a file.
///
/// Every field is optional; unset fields fall back to built-in defaults
/// through the accessor methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_relevance_floor: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_confidence_floor: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_interval_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_limit: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_assignment: Option<bool>,
}

impl Config {
    /// Create a new empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the config file path (~/.state/autotag/defaults.toml)
    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
        Ok(Path::new(&home).join(".state").join("autotag").join("defaults.toml"))
    }

    /// Load config from the default location. A missing file is an empty config.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Merge this config with another, preferring values from other
    pub fn merge(&mut self, other: &Config) {
        if other.low_relevance_floor.is_some() {
            self.low_relevance_floor = other.low_relevance_floor;
        }
        if other.high_confidence_floor.is_some() {
            self.high_confidence_floor = other.high_confidence_floor;
        }
        if other.request_interval_ms.is_some() {
            self.request_interval_ms = other.request_interval_ms;
        }
        if other.workers.is_some() {
            self.workers = other.workers;
        }
        if other.user_agent.is_some() {
            self.user_agent = other.user_agent.clone();
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url.clone();
        }
        if other.search_limit.is_some() {
            self.search_limit = other.search_limit;
        }
        if other.exclusive_assignment.is_some() {
            self.exclusive_assignment = other.exclusive_assignment;
        }
    }

    /// Spacing between catalog requests. Never below the catalog's one
    /// request per second.
    pub fn request_interval(&self) -> Duration {
        let millis = self.request_interval_ms.unwrap_or(DEFAULT_REQUEST_INTERVAL_MS);
        Duration::from_millis(millis.max(DEFAULT_REQUEST_INTERVAL_MS))
    }

    pub fn workers(&self) -> usize {
        self.workers.unwrap_or(DEFAULT_WORKERS).max(1)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn search_limit(&self) -> u32 {
        self.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            low_relevance_floor: self.low_relevance_floor.unwrap_or(DEFAULT_LOW_RELEVANCE_FLOOR),
            high_confidence_floor: self.high_confidence_floor.unwrap_or(DEFAULT_HIGH_CONFIDENCE_FLOOR),
        }
    }

    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            thresholds: self.thresholds(),
            strategy: if self.exclusive_assignment.unwrap_or(false) {
                Arc::new(ExclusiveGreedy)
            } else {
                Arc::new(GreedyPerTrack)
            },
        }
    }

    /// Print the config in a human-readable format
    pub fn print(&self, title: &str) {
        println!("{}:", title);

        if let Some(floor) = self.low_relevance_floor {
            println!("  Low relevance floor:   {}", floor);
        }
        if let Some(floor) = self.high_confidence_floor {
            println!("  High confidence floor: {}", floor);
        }
        if let Some(interval) = self.request_interval_ms {
            println!("  Request interval:      {} ms", interval);
        }
        if let Some(workers) = self.workers {
            println!("  Worker threads:        {}", workers);
        }
        if let Some(user_agent) = &self.user_agent {
            println!("  User agent:            {}", user_agent);
        }
        if let Some(base_url) = &self.base_url {
            println!("  Catalog URL:           {}", base_url);
        }
        if let Some(limit) = self.search_limit {
            println!("  Search limit:          {}", limit);
        }
        if let Some(exclusive) = self.exclusive_assignment {
            println!("  Assignment:            {}", if exclusive { "exclusive" } else { "greedy per track" });
        }
    }
}
