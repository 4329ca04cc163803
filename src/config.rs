//! Runtime configuration.
//!
//! Values come from the environment (after `.env` is loaded by the binaries),
//! with plain-text files in the working directory as a fallback for the
//! script URL and API key.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_SPREADSHEET_ID: &str = "1B0k2LbBkGCUu4lmR4P67xx7OjQ5HXbsr6JrLwEiRUIM";
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://docs.google.com";
pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const SCRIPT_URL_FILE: &str = "apps_script_url.txt";
pub const API_KEY_FILE: &str = "openrouter_api_key.txt";

pub const DEFAULT_MODELS: &[&str] = &[
    "deepseek/deepseek-chat-v3.1:free",
    "meta-llama/llama-3.1-8b-instruct:free",
    "microsoft/phi-3-mini-128k-instruct:free",
    "google/gemma-2-9b-it:free",
];

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub spreadsheet_id: String,
    pub sheets_base_url: String,
    pub apps_script_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_models: Vec<String>,
    pub tab_count: u32,
    pub refresh_interval: Duration,
    pub csv_timeout: Duration,
    pub script_timeout: Duration,
    pub llm_timeout: Duration,
    pub bind_addr: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: DEFAULT_SPREADSHEET_ID.to_string(),
            sheets_base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            apps_script_url: None,
            llm_api_key: None,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            tab_count: 12,
            refresh_interval: Duration::from_secs(300),
            csv_timeout: Duration::from_secs(30),
            script_timeout: Duration::from_secs(60),
            llm_timeout: Duration::from_secs(60),
            bind_addr: "0.0.0.0:8081".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Read configuration from the process environment, falling back to
    /// files in the current directory for the script URL and API key.
    pub fn from_env() -> Self {
        Self::from_env_in(Path::new("."))
    }

    /// Same as `from_env`, resolving fallback files under `dir`
    pub fn from_env_in(dir: &Path) -> Self {
        let mut config = Self::default();

        if let Some(id) = env_nonempty("SPREADSHEET_ID") {
            config.spreadsheet_id = id;
        }
        if let Some(url) = env_nonempty("SHEETS_BASE_URL") {
            config.sheets_base_url = url;
        }
        config.apps_script_url = resolve_script_url(env_nonempty("APPS_SCRIPT_URL"), dir);
        config.llm_api_key = env_nonempty("OPENROUTER_API_KEY")
            .or_else(|| env_nonempty("OPENAI_API_KEY"))
            .or_else(|| read_first_line(&dir.join(API_KEY_FILE)));
        if let Some(url) = env_nonempty("LLM_BASE_URL") {
            config.llm_base_url = url;
        }
        if let Some(models) = env_nonempty("LLM_MODELS") {
            let parsed = parse_model_list(&models);
            if !parsed.is_empty() {
                config.llm_models = parsed;
            }
        }
        if let Some(n) = env_parse::<u32>("SHEET_TAB_COUNT") {
            config.tab_count = n;
        }
        if let Some(secs) = env_parse::<u64>("REFRESH_INTERVAL_SECS") {
            config.refresh_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(addr) = env_nonempty("BIND_ADDR") {
            config.bind_addr = addr;
        }

        if config.llm_api_key.is_none() {
            warn!("No LLM API key configured; chat will use local answers only");
        }
        debug!(
            spreadsheet_id = %config.spreadsheet_id,
            script = config.apps_script_url.is_some(),
            models = config.llm_models.len(),
            "Configuration loaded"
        );
        config
    }

    pub fn with_spreadsheet_id(mut self, id: impl Into<String>) -> Self {
        self.spreadsheet_id = id.into();
        self
    }

    pub fn with_sheets_base_url(mut self, url: impl Into<String>) -> Self {
        self.sheets_base_url = url.into();
        self
    }

    pub fn with_apps_script_url(mut self, url: Option<String>) -> Self {
        self.apps_script_url = url;
        self
    }

    pub fn with_llm(mut self, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        self.llm_base_url = base_url.into();
        self.llm_api_key = api_key;
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.llm_models = models;
        self
    }

    pub fn with_tab_count(mut self, tab_count: u32) -> Self {
        self.tab_count = tab_count;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }
}

/// A script URL is only accepted when it points at the Apps Script host
pub fn is_script_url(url: &str) -> bool {
    url.contains("script.google.com")
}

fn resolve_script_url(from_env: Option<String>, dir: &Path) -> Option<String> {
    if let Some(url) = from_env.filter(|u| is_script_url(u)) {
        return Some(url);
    }
    read_first_line(&dir.join(SCRIPT_URL_FILE)).filter(|u| is_script_url(u))
}

pub fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_first_line(path: &PathBuf) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    content
        .lines()
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_nonempty(key).and_then(|v| v.parse().ok())
}
