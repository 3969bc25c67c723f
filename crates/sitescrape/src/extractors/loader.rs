// ABOUTME: Loader for site profile registries from embedded or user-supplied JSON.
// ABOUTME: Provides load_builtin_registry() to initialize the default ProfileRegistry.

//! Site profile registry loader.
//!
//! Profiles are declared in JSON: a `profiles` array in priority order and a
//! `default` profile used for URLs no other profile matches. Every profile is
//! validated (non-empty chains, compilable selectors) while loading.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::extractors::profile::{ProfileRegistry, SiteProfile};

/// Embedded JSON with the built-in article, Q&A, code-hosting and news profiles.
const BUILTIN_PROFILES_JSON: &str = include_str!("../../data/site_profiles.json");

/// On-disk shape of a profile configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSet {
    #[serde(default)]
    pub profiles: Vec<SiteProfile>,
    pub default: SiteProfile,
}

impl ProfileSet {
    /// Validates every profile and builds a registry in declared order.
    pub fn into_registry(self) -> Result<ProfileRegistry, ScrapeError> {
        let mut registry = ProfileRegistry::new(self.default)?;
        for profile in self.profiles {
            registry.register(profile)?;
        }
        Ok(registry)
    }
}

/// Loads the builtin profile registry from embedded JSON.
pub fn load_builtin_registry() -> Result<ProfileRegistry, ScrapeError> {
    load_registry_from_str(BUILTIN_PROFILES_JSON)
}

/// Parses a profile configuration document.
pub fn load_registry_from_str(json: &str) -> Result<ProfileRegistry, ScrapeError> {
    let set: ProfileSet = serde_json::from_str(json).map_err(|e| {
        ScrapeError::config(
            "LoadProfiles",
            Some(anyhow::anyhow!("invalid profile JSON: {}", e)),
        )
    })?;
    set.into_registry()
}

/// Reads and parses a profile configuration file.
pub fn load_registry_from_path(path: &Path) -> Result<ProfileRegistry, ScrapeError> {
    let json = fs::read_to_string(path).map_err(|e| {
        ScrapeError::config(
            "LoadProfiles",
            Some(anyhow::anyhow!("cannot read {}: {}", path.display(), e)),
        )
    })?;
    load_registry_from_str(&json)
}
