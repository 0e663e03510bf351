use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};

pub const DEFAULT_API_TOKEN_ENV: &str = "PHABRICATOR_API_TOKEN";
pub const DEFAULT_REFRESH_INTERVAL: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub api_token: Option<String>,
    pub api_token_env: Option<String>,
    pub user: Option<String>,
    pub refresh_interval: Option<u64>,
    pub notify: Option<bool>,
    pub play_sound: Option<bool>,
    pub request_timeout: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Clone, PartialEq)]
pub struct Config {
    pub url: Option<String>,
    pub api_token: Option<String>,
    pub api_token_env: String,
    pub user: Option<String>,
    pub refresh_interval: u64,
    pub notify: bool,
    pub play_sound: bool,
    pub request_timeout: u64,
    pub max_retries: u32,
}

// Hand-written so the API token never ends up in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("api_token_env", &self.api_token_env)
            .field("user", &self.user)
            .field("refresh_interval", &self.refresh_interval)
            .field("notify", &self.notify)
            .field("play_sound", &self.play_sound)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        let file_config = load_config_file(config_location(cli))?;
        let config = merge(file_config, cli);
        validate_merged(&config)?;
        Ok(config)
    }

    pub fn settings(&self) -> PollSettings {
        PollSettings {
            refresh_interval: Duration::from_secs(self.refresh_interval),
            notify: self.notify,
            play_sound: self.play_sound,
        }
    }
}

/// Where the config file lives, and whether the user asked for it explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigLocation {
    Explicit(PathBuf),
    Default(Option<PathBuf>),
}

pub fn config_location(cli: &Cli) -> ConfigLocation {
    match &cli.config {
        Some(path) => ConfigLocation::Explicit(PathBuf::from(path)),
        None => ConfigLocation::Default(default_config_path()),
    }
}

/// `$XDG_CONFIG_HOME/phabwatch/config.toml`, falling back to `~/.config`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| Path::new(&h).join(".config")))?;
    Some(base.join("phabwatch").join("config.toml"))
}

/// Read the config file. A missing default file means "use defaults"; a
/// missing file passed with `--config` is an error.
pub fn load_config_file(location: ConfigLocation) -> Result<ConfigFile> {
    let path = match location {
        ConfigLocation::Explicit(path) => {
            if !path.exists() {
                return Err(Error::ConfigNotFound(path));
            }
            path
        }
        ConfigLocation::Default(Some(path)) if path.exists() => path,
        ConfigLocation::Default(_) => return Ok(ConfigFile::default()),
    };
    let content = std::fs::read_to_string(&path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ref url) = config.url {
        validate_url(url)?;
    }
    if let Some(interval) = config.refresh_interval
        && interval == 0
    {
        return Err(Error::ConfigValidation(
            "refresh_interval must be > 0".to_string(),
        ));
    }
    if let Some(timeout) = config.request_timeout
        && timeout == 0
    {
        return Err(Error::ConfigValidation(
            "request_timeout must be > 0".to_string(),
        ));
    }
    if let Some(retries) = config.max_retries
        && !(1..=MAX_RETRIES_LIMIT).contains(&retries)
    {
        return Err(Error::ConfigValidation(format!(
            "max_retries must be between 1 and {MAX_RETRIES_LIMIT}"
        )));
    }
    if let Some(ref env) = config.api_token_env
        && env.trim().is_empty()
    {
        return Err(Error::ConfigValidation(
            "api_token_env must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::ConfigValidation(format!(
            "url must start with http:// or https://: {url}"
        )))
    }
}

// CLI values bypass `validate`, so the merged result is checked again.
fn validate_merged(config: &Config) -> Result<()> {
    if let Some(ref url) = config.url {
        validate_url(url)?;
    }
    if config.refresh_interval == 0 {
        return Err(Error::ConfigValidation(
            "refresh_interval must be > 0".to_string(),
        ));
    }
    if config.request_timeout == 0 {
        return Err(Error::ConfigValidation(
            "request_timeout must be > 0".to_string(),
        ));
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli) -> Config {
    Config {
        url: cli
            .url
            .clone()
            .or(file.url)
            .map(|u| u.trim_end_matches('/').to_string()),
        api_token: file.api_token,
        api_token_env: file
            .api_token_env
            .unwrap_or_else(|| DEFAULT_API_TOKEN_ENV.to_string()),
        user: cli.user.clone().or(file.user),
        refresh_interval: cli
            .poll_seconds
            .or(file.refresh_interval)
            .unwrap_or(DEFAULT_REFRESH_INTERVAL),
        notify: !cli.no_notify && file.notify.unwrap_or(true),
        play_sound: !cli.no_sound && file.play_sound.unwrap_or(true),
        request_timeout: cli
            .request_timeout
            .or(file.request_timeout)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        max_retries: file.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
    }
}

/// The options the poll loop consults at the start of every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub refresh_interval: Duration,
    pub notify: bool,
    pub play_sound: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL),
            notify: true,
            play_sound: true,
        }
    }
}

/// Supplies settings to the scheduler. Called once per cycle so edits take
/// effect on the next poll without a restart.
pub trait SettingsSource: Send + Sync {
    fn load_settings(&self) -> Result<PollSettings>;
}

/// Fixed settings, for `--once` runs and tests.
impl SettingsSource for PollSettings {
    fn load_settings(&self) -> Result<PollSettings> {
        Ok(self.clone())
    }
}

/// Re-reads the config file on every call and applies the CLI overrides on top.
pub struct FileSettings {
    cli: Cli,
}

impl FileSettings {
    pub fn new(cli: &Cli) -> Self {
        Self { cli: cli.clone() }
    }
}

impl SettingsSource for FileSettings {
    fn load_settings(&self) -> Result<PollSettings> {
        Ok(Config::load(&self.cli)?.settings())
    }
}
