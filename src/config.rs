//! Fetch configuration: the injected [`FetchOptions`] value and the optional
//! config file that seeds it.
//!
//! Options are built once (defaults, then config file, then CLI flags) and
//! handed to every fetcher by value. Nothing here is global.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::fetch::constants::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_DOWNLOAD_KB, DEFAULT_REDIRECT_LIMIT, DEFAULT_TIMEOUT,
};
use crate::user_agent;

/// Read-only settings for a bounded fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Budget for establishing a connection.
    pub connect_timeout: Duration,
    /// Per-read timeout, also the wall-clock budget for streaming a body.
    pub timeout: Duration,
    /// Ceiling on redirect hops; callers cannot ask for more.
    pub redirect_limit: u32,
    /// Body size cap in kilobytes.
    pub max_download_kb: u64,
    /// User-Agent sent when the caller supplies none.
    pub user_agent: Option<String>,
    /// Skip TLS certificate verification. Insecure; off by default.
    pub accept_invalid_certs: bool,
    /// Also follow 303, 307 and 308 redirects.
    pub follow_extended_redirects: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
            max_download_kb: DEFAULT_MAX_DOWNLOAD_KB,
            user_agent: Some(user_agent::default_user_agent()),
            accept_invalid_certs: false,
            follow_extended_redirects: false,
        }
    }
}

impl FetchOptions {
    /// Body size cap in bytes.
    #[must_use]
    pub fn max_download_bytes(&self) -> u64 {
        self.max_download_kb.saturating_mul(1024)
    }

    /// Overlays values present in a config file.
    #[must_use]
    pub fn with_file_config(mut self, file_config: &FileConfig) -> Self {
        if let Some(secs) = file_config.connect_timeout_secs {
            self.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file_config.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = file_config.redirect_limit {
            self.redirect_limit = limit;
        }
        if let Some(kb) = file_config.max_download_kb {
            self.max_download_kb = kb;
        }
        if let Some(user_agent) = &file_config.user_agent {
            self.user_agent = Some(user_agent.clone());
        }
        if let Some(insecure) = file_config.accept_invalid_certs {
            self.accept_invalid_certs = insecure;
        }
        if let Some(extended) = file_config.follow_extended_redirects {
            self.follow_extended_redirects = extended;
        }
        self
    }
}

/// Values read from the config file; `None` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Read/stream timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Redirect ceiling.
    pub redirect_limit: Option<u32>,
    /// Body size cap in kilobytes.
    pub max_download_kb: Option<u64>,
    /// User-Agent override.
    pub user_agent: Option<String>,
    /// Disable TLS certificate verification.
    pub accept_invalid_certs: Option<bool>,
    /// Follow 303/307/308.
    pub follow_extended_redirects: Option<bool>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("timeout_secs", self.timeout_secs)?;

        if let Some(limit) = self.redirect_limit
            && !(1..=20).contains(&limit)
        {
            bail!("Invalid config value for `redirect_limit`: {limit}. Expected range: 1..=20");
        }

        if let Some(kb) = self.max_download_kb
            && !(1..=1_048_576).contains(&kb)
        {
            bail!("Invalid config value for `max_download_kb`: {kb}. Expected range: 1..=1048576");
        }

        if let Some(user_agent) = &self.user_agent
            && user_agent.trim().is_empty()
        {
            bail!("Invalid config value for `user_agent`: must not be empty");
        }

        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/preview-fetch/config.toml`
/// 2. `$HOME/.config/preview-fetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("preview-fetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("preview-fetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Loads and validates a config file.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

/// Parses flat `key = value` lines; `#` starts a comment outside strings.
pub fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "timeout_secs" => {
                cfg.timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "redirect_limit" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let limit = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("redirect_limit out of range for u32"))
                    .with_context(context)?;
                cfg.redirect_limit = Some(limit);
            }
            "max_download_kb" => {
                cfg.max_download_kb = Some(parse_integer_u64(value).with_context(context)?);
            }
            "user_agent" => {
                cfg.user_agent = Some(parse_string_literal(value).with_context(context)?);
            }
            "accept_invalid_certs" => {
                cfg.accept_invalid_certs = Some(parse_boolean(value).with_context(context)?);
            }
            "follow_extended_redirects" => {
                cfg.follow_extended_redirects = Some(parse_boolean(value).with_context(context)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => bail!("Expected true or false, got '{other}'"),
    }
}
