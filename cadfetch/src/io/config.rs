//! Fetch configuration stored in `cadfetch.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// File name looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "cadfetch.toml";

/// Placeholder replaced by the identifier in `command.argv`.
pub const ID_PLACEHOLDER: &str = "{id}";
/// Placeholder replaced by the temp destination path in `command.argv`.
pub const DEST_PLACEHOLDER: &str = "{dest}";

/// Fetch configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to the values the
/// downloader has always shipped with.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub downloader: DownloaderConfig,
    pub paths: PathsConfig,
    pub command: CommandConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Fixed pause after every item, in seconds.
    pub delay_seconds: f64,
    /// Maximum number of passes over the unresolved items.
    pub retry_cycles: u32,
    /// Accepted for compatibility; scheduling never consults it.
    pub dynamic_backoff: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub input_file: PathBuf,
    pub pending_file: PathBuf,
    /// Cooperative stop sentinel, polled once per item.
    pub stop_flag: PathBuf,
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    /// Directory for the activity log and the telemetry dump.
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    /// Program and arguments. `{id}` and `{dest}` are substituted per attempt.
    pub argv: Vec<String>,
    /// Wall-clock limit for one attempt, in seconds.
    pub timeout_secs: u64,
    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Phrases treated as "object not found" in addition to the built-in list.
    pub extra_not_found_phrases: Vec<String>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            delay_seconds: 0.1,
            retry_cycles: 10,
            dynamic_backoff: false,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from("cad_nums.txt"),
            pending_file: PathBuf::from("pending.txt"),
            stop_flag: PathBuf::from("stop.flag"),
            output_dir: PathBuf::from("output"),
            temp_dir: PathBuf::from("output_temp"),
            log_dir: PathBuf::from("."),
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            argv: vec![
                "rosreestr2coord".to_string(),
                "-c".to_string(),
                ID_PLACEHOLDER.to_string(),
                "-o".to_string(),
                DEST_PLACEHOLDER.to_string(),
            ],
            timeout_secs: 10 * 60,
            output_limit_bytes: 100_000,
        }
    }
}

impl DownloaderConfig {
    /// Zero when `delay_seconds` does not fit a `Duration`; `validate` rejects those values.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_seconds).unwrap_or_default()
    }
}

impl CommandConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl FetchConfig {
    pub fn validate(&self) -> Result<()> {
        if Duration::try_from_secs_f64(self.downloader.delay_seconds).is_err() {
            return Err(anyhow!(
                "downloader.delay_seconds must be a number >= 0 that fits a duration, got {}",
                self.downloader.delay_seconds
            ));
        }
        if self.downloader.retry_cycles == 0 {
            return Err(anyhow!("downloader.retry_cycles must be >= 1"));
        }
        if self.command.argv.is_empty() || self.command.argv[0].trim().is_empty() {
            return Err(anyhow!("command.argv must be a non-empty array"));
        }
        for placeholder in [ID_PLACEHOLDER, DEST_PLACEHOLDER] {
            if !self
                .command
                .argv
                .iter()
                .any(|arg| arg.contains(placeholder))
            {
                return Err(anyhow!("command.argv must contain {placeholder}"));
            }
        }
        if self.command.timeout_secs == 0 {
            return Err(anyhow!("command.timeout_secs must be > 0"));
        }
        if self.command.output_limit_bytes == 0 {
            return Err(anyhow!("command.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FetchConfig::default()`.
pub fn load_config(path: &Path) -> Result<FetchConfig> {
    if !path.exists() {
        let cfg = FetchConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FetchConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FetchConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    crate::io::write_atomic(path, &buf)
}
