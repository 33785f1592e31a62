//! Environment configuration.
//!
//! - `MANIFEST_DIR` (required): directory of manifests to apply
//! - `MANIFEST_PREFIX`: only load files whose name starts with this prefix
//! - `APPLY_UPDATE`: patch allow-listed fields of existing objects (default false)
//! - `APPLY_VERBOSE`: stream per-manifest progress to stderr (default true)
//! - `APPLY_TIMEOUT_SECS`: overall deadline (default 300)
//! - `APPLY_RETRY_INTERVAL_MS`: pause between rounds (default 200)

use crate::error::ApplierError;
use manifest_apply::{has_prefix, ApplyOptions};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_RETRY_INTERVAL_MS: u64 = 200;

/// Applier configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplierConfig {
    pub manifest_dir: PathBuf,
    pub prefix: Option<String>,
    pub update: bool,
    pub verbose: bool,
    pub timeout: Duration,
    pub retry_interval: Duration,
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool, ApplierError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => Err(ApplierError::InvalidConfig(format!("{key} must be a boolean, got {v:?}"))),
    }
}

fn parse_u64(key: &str, value: Option<String>, default: u64) -> Result<u64, ApplierError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| ApplierError::InvalidConfig(format!("{key} must be a non-negative integer, got {v:?}"))),
    }
}

impl ApplierConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ApplierError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApplierError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let manifest_dir = lookup("MANIFEST_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ApplierError::InvalidConfig("MANIFEST_DIR environment variable is required".to_string()))?;
        let prefix = lookup("MANIFEST_PREFIX").filter(|p| !p.is_empty());

        Ok(Self {
            manifest_dir,
            prefix,
            update: parse_bool("APPLY_UPDATE", lookup("APPLY_UPDATE"), false)?,
            verbose: parse_bool("APPLY_VERBOSE", lookup("APPLY_VERBOSE"), true)?,
            timeout: Duration::from_secs(parse_u64(
                "APPLY_TIMEOUT_SECS",
                lookup("APPLY_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?),
            retry_interval: Duration::from_millis(parse_u64(
                "APPLY_RETRY_INTERVAL_MS",
                lookup("APPLY_RETRY_INTERVAL_MS"),
                DEFAULT_RETRY_INTERVAL_MS,
            )?),
        })
    }

    /// Options for the reconciliation library; progress goes to stderr
    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            update: self.update,
            verbose: self.verbose,
            filters: self.prefix.iter().map(|p| has_prefix(p.clone())).collect(),
            retry_interval: self.retry_interval,
            ..Default::default()
        }
    }
}
