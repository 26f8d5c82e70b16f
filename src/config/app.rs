//! Application configuration loading from config.toml
//!
//! This module loads the settings the ledger needs at runtime: how many rows a
//! history page shows and the VIP tiers that lifetime spend unlocks. Discord role
//! ids are carried along for a chat front end. Secrets such as the database URL
//! stay in the environment.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming an alternate config file
pub const CONFIG_PATH_ENV: &str = "APEX_CONFIG";

const fn default_page_size() -> u64 {
    10
}

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Discord role ids, kept for the chat front end
    #[serde(default)]
    pub role_ids: RoleIds,
    /// Rows shown per page of order or wallet history
    #[serde(default = "default_page_size")]
    pub history_page_size: u64,
    /// VIP tiers, unlocked by lifetime spend
    #[serde(default)]
    pub vip_tiers: Vec<VipTier>,
}

/// Discord role ids read from the config
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleIds {
    /// Discord role id of shop staff. Parsed and kept as-is; the ledger does not
    /// check permissions.
    pub admin: Option<u64>,
}

/// A VIP tier and the lifetime spend needed to reach it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VipTier {
    /// Tier name, matched against `discounts.vip_tier`
    pub name: String,
    /// Lifetime spend in cents at which the tier starts
    pub min_lifetime_spend_cents: i64,
    /// Discord role that goes with the tier. Only the name and threshold are
    /// used by the ledger.
    pub role_id: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            role_ids: RoleIds::default(),
            history_page_size: default_page_size(),
            vip_tiers: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Highest tier whose threshold is at or below `lifetime_spent_cents`.
    #[must_use]
    pub fn vip_tier_for(&self, lifetime_spent_cents: i64) -> Option<&VipTier> {
        self.vip_tiers
            .iter()
            .filter(|tier| tier.min_lifetime_spend_cents <= lifetime_spent_cents)
            .max_by_key(|tier| tier.min_lifetime_spend_cents)
    }

    fn validate(self) -> Result<Self> {
        if self.history_page_size == 0 {
            return Err(Error::Config {
                message: "history_page_size must be at least 1".to_string(),
            });
        }
        if let Some(tier) = self.vip_tiers.iter().find(|t| t.name.trim().is_empty()) {
            return Err(Error::Config {
                message: format!(
                    "VIP tier at {} cents has an empty name",
                    tier.min_lifetime_spend_cents
                ),
            });
        }
        Ok(self)
    }
}

/// Parses configuration from TOML text.
///
/// # Errors
/// Returns an error if the TOML syntax is invalid or a value fails validation.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value fails validation
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Loads configuration from `$APEX_CONFIG`, falling back to `./config.toml`.
///
/// A missing default file yields the default configuration.
pub fn load_default_config() -> Result<AppConfig> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => load_config(path),
        Err(_) if !Path::new("config.toml").exists() => {
            tracing::warn!("config.toml not found, using defaults");
            Ok(AppConfig::default())
        }
        Err(_) => load_config("config.toml"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const SAMPLE: &str = r#"
        history_page_size = 5

        [role_ids]
        admin = 1100000000000000001

        [[vip_tiers]]
        name = "Silver"
        min_lifetime_spend_cents = 10000

        [[vip_tiers]]
        name = "Gold"
        min_lifetime_spend_cents = 50000
        role_id = 1100000000000000002
    "#;

    #[test]
    fn test_parse_app_config() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.history_page_size, 5);
        assert_eq!(config.role_ids.admin, Some(1_100_000_000_000_000_001));
        assert_eq!(config.vip_tiers.len(), 2);
        assert_eq!(config.vip_tiers[1].role_id, Some(1_100_000_000_000_000_002));
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = parse_config("").unwrap();
        assert_eq!(config.history_page_size, 10);
        assert!(config.role_ids.admin.is_none());
        assert!(config.vip_tiers.is_empty());
    }

    #[test]
    fn test_vip_tier_for_picks_highest_reached() {
        let config = parse_config(SAMPLE).unwrap();
        assert!(config.vip_tier_for(9_999).is_none());
        assert_eq!(config.vip_tier_for(10_000).unwrap().name, "Silver");
        assert_eq!(config.vip_tier_for(49_999).unwrap().name, "Silver");
        assert_eq!(config.vip_tier_for(75_000).unwrap().name, "Gold");
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let result = parse_config("history_page_size = 0");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_blank_tier_name_rejected() {
        let result = parse_config(
            r#"
            [[vip_tiers]]
            name = "  "
            min_lifetime_spend_cents = 1
            "#,
        );
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
