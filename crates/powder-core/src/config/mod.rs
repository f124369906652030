//! Runtime configuration.
//!
//! Every field is optional: with no Supabase endpoint configured the catalog
//! runs local-only.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

const ENV_SUPABASE_URL: &str = "POWDER_SUPABASE_URL";
const ENV_SUPABASE_ANON_KEY: &str = "POWDER_SUPABASE_ANON_KEY";
const ENV_STORAGE_BUCKET: &str = "POWDER_STORAGE_BUCKET";
const ENV_CACHE_PATH: &str = "POWDER_CACHE_PATH";
const ENV_REFRESH_AFTER_WRITE: &str = "POWDER_REFRESH_AFTER_WRITE";

const DEFAULT_STORAGE_BUCKET: &str = "thumbnails";

/// Client configuration.
///
/// Values are public endpoints and keys; secrets must never be stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PowderConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    #[serde(default)]
    pub storage_bucket: Option<String>,
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
    #[serde(default = "default_refresh_after_write")]
    pub refresh_after_write: bool,
}

const fn default_refresh_after_write() -> bool {
    true
}

impl Default for PowderConfig {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            storage_bucket: None,
            cache_path: None,
            refresh_after_write: default_refresh_after_write(),
        }
    }
}

/// Engine behavior knobs derived from [`PowderConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Pull the full remote snapshot after a successful create/update.
    pub refresh_after_write: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            refresh_after_write: default_refresh_after_write(),
        }
    }
}

impl PowderConfig {
    /// Load configuration from `POWDER_*` environment variables.
    pub fn from_env() -> Result<Self> {
        parse_config(|key| env::var(key).ok())
    }

    /// Parse a JSON configuration document.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)?;
        config.validated()
    }

    /// The Supabase `(url, anon key)` pair, when remote sync is configured.
    pub fn supabase(&self) -> Option<(&str, &str)> {
        Some((
            self.supabase_url.as_deref()?,
            self.supabase_anon_key.as_deref()?,
        ))
    }

    #[must_use]
    pub fn storage_bucket(&self) -> &str {
        self.storage_bucket
            .as_deref()
            .unwrap_or(DEFAULT_STORAGE_BUCKET)
    }

    #[must_use]
    pub const fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            refresh_after_write: self.refresh_after_write,
        }
    }

    fn validated(self) -> Result<Self> {
        let supabase_url = normalize_text_option(self.supabase_url)
            .map(|url| url.trim_end_matches('/').to_string());
        let supabase_anon_key = normalize_text_option(self.supabase_anon_key);

        match (&supabase_url, &supabase_anon_key) {
            (Some(url), Some(_)) if !is_http_url(url) => {
                return Err(Error::InvalidInput(
                    "supabase_url must include http:// or https://".to_string(),
                ));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::InvalidInput(
                    "supabase_url and supabase_anon_key must be set together".to_string(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            storage_bucket: normalize_text_option(self.storage_bucket),
            cache_path: self.cache_path.filter(|path| !path.as_os_str().is_empty()),
            refresh_after_write: self.refresh_after_write,
        })
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<PowderConfig> {
    let refresh_after_write = match normalize_text_option(lookup(ENV_REFRESH_AFTER_WRITE)) {
        None => default_refresh_after_write(),
        Some(value) => parse_flag(&value).ok_or_else(|| {
            Error::InvalidInput(format!(
                "{ENV_REFRESH_AFTER_WRITE} must be true/false, got '{value}'"
            ))
        })?,
    };

    PowderConfig {
        supabase_url: lookup(ENV_SUPABASE_URL),
        supabase_anon_key: lookup(ENV_SUPABASE_ANON_KEY),
        storage_bucket: lookup(ENV_STORAGE_BUCKET),
        cache_path: normalize_text_option(lookup(ENV_CACHE_PATH)).map(PathBuf::from),
        refresh_after_write,
    }
    .validated()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_is_local_only() {
        let config = parse_config(lookup_from(&[])).unwrap();
        assert_eq!(config, PowderConfig::default());
        assert!(config.supabase().is_none());
        assert_eq!(config.storage_bucket(), "thumbnails");
    }

    #[test]
    fn full_environment_enables_remote() {
        let config = parse_config(lookup_from(&[
            (ENV_SUPABASE_URL, "https://demo.supabase.co/"),
            (ENV_SUPABASE_ANON_KEY, " anon "),
            (ENV_CACHE_PATH, "/tmp/powder/cache.db"),
            (ENV_REFRESH_AFTER_WRITE, "off"),
        ]))
        .unwrap();

        assert_eq!(
            config.supabase(),
            Some(("https://demo.supabase.co", "anon"))
        );
        assert_eq!(config.cache_path, Some(PathBuf::from("/tmp/powder/cache.db")));
        assert!(!config.sync_options().refresh_after_write);
    }

    #[test]
    fn partial_supabase_pair_is_rejected() {
        let error = parse_config(lookup_from(&[(ENV_SUPABASE_URL, "https://demo.supabase.co")]))
            .unwrap_err();
        assert!(error.to_string().contains("set together"));
    }

    #[test]
    fn invalid_flag_is_rejected() {
        let error = parse_config(lookup_from(&[(ENV_REFRESH_AFTER_WRITE, "maybe")])).unwrap_err();
        assert!(error.to_string().contains(ENV_REFRESH_AFTER_WRITE));
    }

    #[test]
    fn json_config_rejects_unknown_fields() {
        let error = PowderConfig::from_json(r#"{"supabase_url":null,"turso_url":"x"}"#).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn json_config_requires_http_scheme() {
        let error = PowderConfig::from_json(
            r#"{"supabase_url":"demo.supabase.co","supabase_anon_key":"anon"}"#,
        )
        .unwrap_err();
        assert!(error.to_string().contains("http://"));
    }

    #[test]
    fn json_config_defaults_refresh_after_write() {
        let config = PowderConfig::from_json(r#"{"storage_bucket":"maps"}"#).unwrap();
        assert!(config.refresh_after_write);
        assert_eq!(config.storage_bucket(), "maps");
    }
}
