use std::{env, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Url;

pub const DEFAULT_UPSTREAM_URL: &str = "https://gpt1image.exomlapi.com/v1/images/generations";
pub const DEFAULT_REFERER: &str = "https://gpt1image.exomlapi.com/";
pub const DEFAULT_RELAY_ORIGIN: &str = "https://gpt1image.exomlapi.com";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36";

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Pipe upstream bytes through as they arrive.
    Stream,
    /// Download fully, then re-sniff the content type.
    Buffer,
}

impl FromStr for RelayMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stream" => Ok(RelayMode::Stream),
            "buffer" => Ok(RelayMode::Buffer),
            other => Err(anyhow!("expected `stream` or `buffer`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub prefix: String,
    pub origin: Url,
    pub mode: RelayMode,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            prefix: "/proxy".to_string(),
            origin: Url::parse(DEFAULT_RELAY_ORIGIN).expect("valid default url"),
            mode: RelayMode::Stream,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub upstream_url: Url,
    pub referer: String,
    pub upstream_timeout: Duration,
    pub max_upload_bytes: usize,
    /// `None` when the relay is disabled and upstream URLs are returned as-is.
    pub relay: Option<RelayConfig>,
    pub static_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            upstream_url: Url::parse(DEFAULT_UPSTREAM_URL).expect("valid default url"),
            referer: DEFAULT_REFERER.to_string(),
            upstream_timeout: Duration::from_secs(120),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            relay: Some(RelayConfig::default()),
            static_dir: "public".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let relay_enabled = parse_or(get("RELAY_ENABLED"), "RELAY_ENABLED", true)?;
        let relay = if relay_enabled {
            let default_relay = RelayConfig::default();
            let prefix = match get("RELAY_PREFIX") {
                Some(prefix) => normalize_prefix(&prefix)?,
                None => default_relay.prefix,
            };
            let origin = match get("RELAY_ORIGIN") {
                Some(origin) => parse_origin(&origin)?,
                None => default_relay.origin,
            };
            let mode = parse_or(get("RELAY_MODE"), "RELAY_MODE", default_relay.mode)?;
            Some(RelayConfig { prefix, origin, mode })
        } else {
            None
        };

        Ok(Self {
            port: parse_or(get("PORT"), "PORT", defaults.port)?,
            upstream_url: parse_or(get("UPSTREAM_URL"), "UPSTREAM_URL", defaults.upstream_url)?,
            referer: get("UPSTREAM_REFERER").unwrap_or(defaults.referer),
            upstream_timeout: Duration::from_secs(parse_or(
                get("UPSTREAM_TIMEOUT_SECS"),
                "UPSTREAM_TIMEOUT_SECS",
                defaults.upstream_timeout.as_secs(),
            )?),
            max_upload_bytes: parse_or(
                get("MAX_UPLOAD_BYTES"),
                "MAX_UPLOAD_BYTES",
                defaults.max_upload_bytes,
            )?,
            relay,
            static_dir: get("STATIC_DIR").unwrap_or(defaults.static_dir),
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| anyhow!("{e}"))
            .with_context(|| format!("invalid value for {key}: `{raw}`")),
        None => Ok(default),
    }
}

fn normalize_prefix(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.contains(['?', '#', '*', ':', '{', '}']) {
        bail!("invalid value for RELAY_PREFIX: `{raw}`");
    }
    Ok(if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    })
}

fn parse_origin(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid value for RELAY_ORIGIN: `{raw}`"))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        bail!("RELAY_ORIGIN must be an http(s) origin, got `{raw}`");
    }
    // Only scheme, host and port are kept.
    Url::parse(&url.origin().ascii_serialization()).context("RELAY_ORIGIN has no serializable origin")
}
