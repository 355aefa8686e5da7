use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::actuation::{mask_secret, DEFAULT_API_URL, DEFAULT_LABEL};
use crate::logging::LogLevel;

pub const ENV_API_KEY: &str = "SHOCK_API_KEY";
pub const ENV_DEVICE_ID: &str = "SHOCK_ID";
pub const ENV_API_URL: &str = "SHOCK_API_URL";
pub const ENV_LABEL: &str = "SHOCK_LABEL";

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_TICK_MS: u64 = 100;
const MIN_TICK_MS: u64 = 10;
const MAX_TICK_MS: u64 = 1000;

/// Player options that can be set via CLI, env file or environment
#[derive(Debug, Clone)]
pub struct Options {
    // Commandline-only options
    pub env_file: Option<PathBuf>,
    pub events_file: Option<PathBuf>,
    pub log_level: LogLevel,
    pub tick_interval: Duration,

    // Commandline and env file options
    pub api_token: Option<String>,
    pub device_id: Option<String>,
    pub api_url: String,
    pub label: String,
    pub actuation_enabled: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            env_file: None,
            events_file: None,
            log_level: LogLevel::Info,
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            api_token: None,
            device_id: None,
            api_url: DEFAULT_API_URL.to_string(),
            label: DEFAULT_LABEL.to_string(),
            actuation_enabled: true,
        }
    }
}

impl Options {
    /// Apply `KEY=VALUE` settings. Empty values count as unset.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(token) = get(ENV_API_KEY) {
            self.api_token = Some(token);
        }
        if let Some(id) = get(ENV_DEVICE_ID) {
            self.device_id = Some(id);
        }
        if let Some(url) = get(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(label) = get(ENV_LABEL) {
            self.label = label;
        }
    }

    /// Log what was loaded without revealing the token
    pub fn log_summary(&self) {
        tracing::info!(
            "Loaded API Key: {}",
            self.api_token.as_deref().map(mask_secret).unwrap_or_else(|| "Not Found".to_string())
        );
        tracing::info!("Loaded Shock ID: {}", self.device_id.as_deref().unwrap_or("Not Found"));
        tracing::debug!("API endpoint: {}", self.api_url);
        tracing::debug!("Tick interval: {:?}", self.tick_interval);
    }
}

/// Parse env file text, invoking `handler` for each key-value pair.
///
/// Accepts `#` comment lines, an optional `export ` prefix, and values wrapped
/// in matching single or double quotes.
pub fn parse_env(data: &str, handler: &mut dyn FnMut(&str, &str)) {
    for (lineno, raw) in data.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            tracing::warn!("Key without value on line {}", lineno + 1);
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            tracing::warn!("Value without key on line {}", lineno + 1);
            continue;
        }

        handler(key, unquote(value.trim()));
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Read an env file into a key/value map
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read env file {}", path.display()))?;

    let mut vars = HashMap::new();
    parse_env(&data, &mut |k, v| {
        vars.insert(k.to_string(), v.to_string());
    });
    Ok(vars)
}

/// Default env file: next to the executable, else the working directory
fn default_env_file() -> Option<PathBuf> {
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_ENV_FILE)));

    beside_exe
        .into_iter()
        .chain(std::iter::once(PathBuf::from(DEFAULT_ENV_FILE)))
        .find(|p| p.is_file())
}

/// Load configuration from the env file and the process environment.
///
/// An explicitly requested env file must exist; the default one is optional.
/// Process environment variables take precedence over the file.
pub fn load_config(env_file: &Option<PathBuf>) -> Result<Options> {
    let mut opts = Options::default();

    let file = match env_file {
        Some(path) => {
            if !path.is_file() {
                anyhow::bail!("Env file not found: {}", path.display());
            }
            Some(path.clone())
        }
        None => default_env_file(),
    };

    match &file {
        Some(path) => {
            tracing::debug!("Reading configuration from {}", path.display());
            let vars = read_env_file(path)?;
            opts.apply_vars(|k| vars.get(k).cloned());
        }
        None => tracing::debug!("No env file found"),
    }
    opts.env_file = file;

    opts.apply_vars(|k| std::env::var(k).ok());
    Ok(opts)
}

/// Parse a tick period in milliseconds, clamped to a sane range
pub fn parse_tick_ms(s: &str) -> Result<Duration> {
    let ms: u64 = s.trim().parse().context("Invalid tick interval")?;
    Ok(Duration::from_millis(ms.clamp(MIN_TICK_MS, MAX_TICK_MS)))
}
