// Checker configuration
// Loaded from <config_dir>/tmcheck/config.json when present, CLI flags override

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONCURRENCY_LIMIT: usize = 20;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckerConfig {
    /// Maximum simultaneously in-flight term lookups
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// Registry gateway serving JSON result pages; unset means only
    /// fixture-backed runs are possible
    #[serde(default)]
    pub backend_base_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_concurrency_limit() -> usize {
    DEFAULT_CONCURRENCY_LIMIT
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            backend_base_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[allow(dead_code)]
impl CheckerConfig {
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.backend_base_url = Some(url.to_string());
        self
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        match Self::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: CheckerConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Invalid config {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Apply command-line overrides on top of file values
    pub fn apply_overrides(
        mut self,
        concurrency: Option<usize>,
        base_url: Option<String>,
    ) -> Result<Self> {
        if let Some(limit) = concurrency {
            self.concurrency_limit = limit;
        }
        if let Some(url) = base_url {
            self.backend_base_url = Some(url);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            return Err(anyhow!("concurrency_limit must be at least 1"));
        }
        if matches!(&self.backend_base_url, Some(url) if url.trim().is_empty()) {
            return Err(anyhow!("backend_base_url must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// Gateway URL, required by the HTTP backend
    pub fn require_base_url(&self) -> Result<&str> {
        self.backend_base_url.as_deref().ok_or_else(|| {
            anyhow!("No registry gateway configured. Pass --base-url, set backend_base_url in the config file, or use --fixture")
        })
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|dir| dir.join("tmcheck").join("config.json"))
    }
}

/// Display current configuration
pub fn show_current_config() -> Result<()> {
    use colored::Colorize;

    let config = CheckerConfig::load()?;
    println!("\n{}", "Current tmcheck configuration:".cyan().bold());
    println!();
    println!("  Concurrency limit: {}", config.concurrency_limit.to_string().green());
    match &config.backend_base_url {
        Some(url) => println!("  Registry gateway: {}", url),
        None => println!("  Registry gateway: {}", "not set (use --base-url or --fixture)".yellow()),
    }
    println!("  Request timeout: {}s", config.request_timeout_secs);
    println!();
    match CheckerConfig::config_file_path() {
        Some(path) if path.exists() => println!("  Config file: {}", path.display()),
        Some(path) => println!("  Config file: {} (not created, using defaults)", path.display()),
        None => println!("  Config file: unavailable on this system"),
    }
    println!();
    Ok(())
}

/// Write a default config file if none exists yet
pub fn init_config() -> Result<PathBuf> {
    let path = CheckerConfig::config_file_path()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;
    if path.exists() {
        return Err(anyhow!("Config already exists: {}", path.display()));
    }
    CheckerConfig::default().save_to(&path)?;
    Ok(path)
}
