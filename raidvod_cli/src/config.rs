use crate::paths;
use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use raidvod_core::metadata::template;
use raidvod_core::upload::DEFAULT_CATEGORY_ID;
use raidvod_core::{Difficulty, EligibilityConfig, VideoTemplate, Visibility};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable prefix, nested keys split on `__`
pub const ENV_PREFIX: &str = "RAIDVOD_";

/// Keys holding lists, set from comma-separated values
const ARRAY_KEYS: &[&str] = &[
    "watch.file_types",
    "watch.search_keywords",
    "watch.difficulties",
    "youtube_video.tags",
];

/// Keys that must stay strings even when they look like numbers
const STRING_KEYS: &[&str] = &[
    "watch.directory",
    "youtube_video.category_id",
    "youtube_video.description",
    "authentication.directory",
    "authentication.client_secrets_file",
    "authentication.token_file",
    "database.path",
];

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub youtube_video: YouTubeVideoConfig,

    #[serde(default)]
    pub authentication: AuthenticationConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[serde(alias = "debug")]
    Debug,
    #[default]
    #[serde(alias = "info")]
    Info,
    #[serde(alias = "warning", alias = "WARN", alias = "warn")]
    Warning,
    #[serde(alias = "error")]
    Error,
    #[serde(alias = "critical")]
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// `log` has no critical level; it shares `error`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Debug => log::LevelFilter::Debug,
            Self::Info => log::LevelFilter::Info,
            Self::Warning => log::LevelFilter::Warn,
            Self::Error | Self::Critical => log::LevelFilter::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" => Ok(Self::Critical),
            other => anyhow::bail!(
                "log_level must be one of DEBUG, INFO, WARNING, ERROR, CRITICAL (got '{other}')"
            ),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct WatchConfig {
    /// Directory holding the recordings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Extensions with the leading `.`
    pub file_types: Vec<String>,
    /// A file qualifies when its stem contains any of these
    pub search_keywords: Vec<String>,
    pub difficulties: Vec<Difficulty>,
    pub poll_interval_seconds: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let eligibility = EligibilityConfig::default();
        Self {
            directory: None,
            file_types: eligibility.allowed_extensions,
            search_keywords: eligibility.required_keywords,
            difficulties: eligibility.allowed_difficulties,
            poll_interval_seconds: 15,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct YouTubeVideoConfig {
    pub visibility: Visibility,
    /// Supports `{difficulty}`, `{killed_at}` and `{killed_on}`
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
}

impl Default for YouTubeVideoConfig {
    fn default() -> Self {
        let template = VideoTemplate::default();
        Self {
            visibility: Visibility::default(),
            description: template.description,
            tags: template.tags,
            category_id: DEFAULT_CATEGORY_ID.to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AuthenticationConfig {
    /// Holds the client secrets and the saved token
    pub directory: PathBuf,
    pub client_secrets_file: String,
    pub token_file: String,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            directory: paths::get_auth_dir(),
            client_secrets_file: "client_secrets.json".to_string(),
            token_file: "token.json".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct DatabaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl AppConfig {
    pub fn eligibility(&self) -> EligibilityConfig {
        EligibilityConfig {
            allowed_extensions: self.watch.file_types.clone(),
            required_keywords: self.watch.search_keywords.clone(),
            allowed_difficulties: self.watch.difficulties.clone(),
        }
    }

    pub fn video_template(&self) -> VideoTemplate {
        VideoTemplate {
            description: self.youtube_video.description.clone(),
            tags: self.youtube_video.tags.clone(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.watch.poll_interval_seconds)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(paths::get_database_path)
    }

    pub fn client_secrets_path(&self) -> PathBuf {
        self.authentication
            .directory
            .join(&self.authentication.client_secrets_file)
    }

    pub fn token_path(&self) -> PathBuf {
        self.authentication
            .directory
            .join(&self.authentication.token_file)
    }

    /// The directory to watch, a command line override taking precedence
    pub fn watch_directory(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.watch.directory.clone())
            .context(
                "No directory to watch: pass --directory or run \
                 'raidvod config set watch.directory <DIR>'",
            )
    }

    /// Check everything the watch loop relies on
    pub fn validate(&self) -> Result<()> {
        if let Some(directory) = &self.watch.directory
            && !directory.is_dir()
        {
            anyhow::bail!(
                "watch.directory '{}' does not exist or is not a directory",
                directory.display()
            );
        }

        self.eligibility()
            .validate()
            .context("Invalid watch.file_types")?;

        template::validate_description(&self.youtube_video.description)
            .context("Invalid youtube_video.description")?;

        if self.watch.poll_interval_seconds == 0 {
            anyhow::bail!("watch.poll_interval_seconds must be greater than 0");
        }

        if self.youtube_video.category_id.trim().is_empty() {
            anyhow::bail!("youtube_video.category_id must not be empty");
        }

        Ok(())
    }
}

/// Layered configuration: defaults < TOML file < `RAIDVOD_` environment
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
        }
    }

    /// Use a specific file, e.g. from `--config`
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().context("Failed to load configuration")
    }

    /// Read the configuration again into a fresh value
    ///
    /// Nothing already handed out is modified; callers swap the returned
    /// value in themselves.
    pub fn reload(&self) -> Result<AppConfig> {
        let config = self.load()?;
        config.validate()?;
        log::info!(
            "Reloaded configuration from {}",
            self.config_path.display()
        );
        Ok(config)
    }

    /// Get a configuration value by dot-notation key
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        let value: toml::Value = toml::from_str(&toml::to_string(&config)?)?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        display_value(current)
            .ok_or_else(|| anyhow::anyhow!("Value at '{}' is not a simple type", key))
    }

    /// Set a configuration value by dot-notation key and save the file
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parsed_value = parse_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = parts.split_last() else {
            anyhow::bail!("Empty key");
        };

        let mut current = &mut config;
        for part in parents {
            let toml::Value::Table(table) = current else {
                anyhow::bail!("Invalid key path: expected table at '{}'", part);
            };
            current = table
                .entry(part.to_string())
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }
        let toml::Value::Table(table) = current else {
            anyhow::bail!("Cannot set value on non-table");
        };
        table.insert(last.to_string(), parsed_value);

        // Refuse to save a file that would no longer load
        let candidate: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Serialized::defaults(&config))
            .extract()
            .with_context(|| format!("Invalid value for '{key}'"))?;
        log::debug!("Validated new configuration: {candidate:?}");

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml::to_string_pretty(&config)?)?;

        Ok(())
    }

    /// All effective values in key order
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let config = self.load()?;
        let value: toml::Value = toml::from_str(&toml::to_string(&config)?)?;

        let mut items = Vec::new();
        collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }
}

fn display_value(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Option<Vec<_>>>()
            .map(|items| items.join(",")),
        _ => None,
    }
}

fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
    if let toml::Value::Table(table) = value {
        for (key, val) in table {
            let new_prefix = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            collect_values(val, new_prefix, items);
        }
    } else if let Some(display) = display_value(value) {
        items.push((prefix, display));
    }
}

/// Parse and normalise a value for `key`
fn parse_config_value(key: &str, value: &str) -> Result<toml::Value> {
    match key {
        "log_level" => Ok(toml::Value::String(
            LogLevel::from_str(value)?.as_str().to_string(),
        )),
        "youtube_video.visibility" => {
            let visibility = Visibility::from_str(value).map_err(anyhow::Error::msg)?;
            Ok(toml::Value::String(visibility.as_str().to_string()))
        }
        "youtube_video.description" => {
            template::validate_description(value)?;
            Ok(toml::Value::String(value.to_string()))
        }
        "watch.poll_interval_seconds" => {
            let seconds: u64 = value
                .parse()
                .context("poll_interval_seconds must be a positive integer")?;
            if seconds == 0 {
                anyhow::bail!("poll_interval_seconds must be greater than 0");
            }
            Ok(toml::Value::Integer(seconds as i64))
        }
        "watch.difficulties" => {
            let difficulties = split_list(value)
                .map(|d| Difficulty::from_str(&d).map(|d| toml::Value::String(d.to_string())))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(anyhow::Error::msg)?;
            Ok(toml::Value::Array(difficulties))
        }
        "watch.file_types" => {
            let file_types: Vec<String> = split_list(value).collect();
            EligibilityConfig {
                allowed_extensions: file_types.clone(),
                ..Default::default()
            }
            .validate()?;
            Ok(toml::Value::Array(
                file_types.into_iter().map(toml::Value::String).collect(),
            ))
        }
        k if ARRAY_KEYS.contains(&k) => Ok(toml::Value::Array(
            split_list(value).map(toml::Value::String).collect(),
        )),
        k if STRING_KEYS.contains(&k) => Ok(toml::Value::String(value.to_string())),
        _ => {
            if let Ok(b) = value.parse::<bool>() {
                Ok(toml::Value::Boolean(b))
            } else if let Ok(i) = value.parse::<i64>() {
                Ok(toml::Value::Integer(i))
            } else {
                Ok(toml::Value::String(value.to_string()))
            }
        }
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

/// Interactive setup for the watched directory and upload settings
pub fn interactive_init(manager: &mut ConfigManager, force: bool) -> Result<()> {
    println!("{}", "raidvod Setup".bold());
    println!("{}", "=============".bold());
    println!();

    let current = manager.load().unwrap_or_default();

    if !force && current.watch.directory.is_some() {
        let reconfigure = Confirm::new()
            .with_prompt("Configuration already exists. Reconfigure?")
            .default(false)
            .interact()
            .context("Failed to read input")?;

        if !reconfigure {
            println!("Setup cancelled.");
            return Ok(());
        }
    }

    let mut directory = Input::<String>::new().with_prompt("Recordings directory");
    if let Some(existing) = &current.watch.directory {
        directory = directory.default(existing.display().to_string());
    }
    let directory = directory
        .validate_with(|input: &String| -> Result<(), &str> {
            if Path::new(input).is_dir() {
                Ok(())
            } else {
                Err("Not an existing directory")
            }
        })
        .interact_text()
        .context("Failed to read directory")?;

    let visibilities = [Visibility::Private, Visibility::Unlisted, Visibility::Public];
    let selected = visibilities
        .iter()
        .position(|v| *v == current.youtube_video.visibility)
        .unwrap_or(0);
    let visibility = Select::new()
        .with_prompt("Video visibility")
        .items(&visibilities.map(|v| v.as_str()))
        .default(selected)
        .interact()
        .context("Failed to read visibility")?;

    let checked: Vec<bool> = Difficulty::ALL
        .iter()
        .map(|d| current.watch.difficulties.contains(d))
        .collect();
    let difficulties = MultiSelect::new()
        .with_prompt("Difficulties to upload")
        .items(&Difficulty::ALL.map(|d| d.as_str()))
        .defaults(&checked)
        .interact()
        .context("Failed to read difficulties")?;
    let difficulties: Vec<&str> = difficulties
        .into_iter()
        .map(|i| Difficulty::ALL[i].as_str())
        .collect();

    manager.set("watch.directory", &directory)?;
    manager.set("youtube_video.visibility", visibilities[visibility].as_str())?;
    manager.set("watch.difficulties", &difficulties.join(","))?;

    println!();
    println!(
        "{} {}",
        "✓ Configuration saved to".green(),
        manager.get_config_path().display()
    );
    println!();
    println!("Next steps:");
    println!("  raidvod auth login   - authorize uploads to your channel");
    println!("  raidvod watch        - start uploading new kills");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.youtube_video.category_id, "22");
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(LogLevel::Warning.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Critical.to_level_filter(), log::LevelFilter::Error);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_template() {
        let mut config = AppConfig::default();
        config.youtube_video.description = "Killed {boss}".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.watch.directory = Some(temp_dir.path().join("gone"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watch_directory_override() {
        let mut config = AppConfig::default();
        assert!(config.watch_directory(None).is_err());

        config.watch.directory = Some(PathBuf::from("/vods"));
        assert_eq!(config.watch_directory(None).unwrap(), PathBuf::from("/vods"));
        assert_eq!(
            config.watch_directory(Some(Path::new("/other"))).unwrap(),
            PathBuf::from("/other")
        );
    }

    #[test]
    fn test_parse_array_values() {
        let value = parse_config_value("youtube_video.tags", "WoW, Raid ,{difficulty}").unwrap();
        assert_eq!(
            value,
            toml::Value::Array(vec![
                toml::Value::String("WoW".to_string()),
                toml::Value::String("Raid".to_string()),
                toml::Value::String("{difficulty}".to_string()),
            ])
        );
    }

    #[test]
    fn test_parse_normalises_enums() {
        assert_eq!(
            parse_config_value("watch.difficulties", "mythic,heroic").unwrap(),
            toml::Value::Array(vec![
                toml::Value::String("Mythic".to_string()),
                toml::Value::String("Heroic".to_string()),
            ])
        );
        assert_eq!(
            parse_config_value("youtube_video.visibility", "Unlisted").unwrap(),
            toml::Value::String("unlisted".to_string())
        );
        assert!(parse_config_value("watch.difficulties", "LFR").is_err());
        assert!(parse_config_value("watch.file_types", "mp4").is_err());
    }

    #[test]
    fn test_category_id_stays_a_string() {
        assert_eq!(
            parse_config_value("youtube_video.category_id", "20").unwrap(),
            toml::Value::String("20".to_string())
        );
    }
}
