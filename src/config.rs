//! Language registry and TOML configuration.
//!
//! A config file adds or replaces languages and entity kinds:
//!
//! ```toml
//! [[kind]]
//! name = "trigger"
//! keywords = ["trigger"]
//!
//! [[language]]
//! name = "plsql"
//! extensions = ["pls", "pkb"]
//! line_comments = ["--"]
//! case_sensitive = false
//! prototype_enders = { function = [";", "is"], trigger = ["begin"] }
//! ```

use crate::error::{ConfigError, ProfileError, Result};
use crate::profile::{builtin_profiles, EntityKind, KindTable, LanguageProfile, ProfileSupport};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    language: Vec<LanguageProfile>,
    #[serde(default)]
    kind: Vec<EntityKind>,
}

/// Every language and entity kind available to a run.
#[derive(Debug, Clone)]
pub struct Registry {
    profiles: Vec<LanguageProfile>,
    kinds: KindTable,
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            profiles: builtin_profiles(),
            kinds: KindTable::default(),
        }
    }
}

impl Registry {
    /// Built-in languages extended by the config file at `path`.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, ConfigError> {
        let config: ConfigFile = toml::from_str(text)?;
        let mut registry = Registry::default();
        for kind in config.kind {
            debug!(kind = %kind.name, "configured kind");
            registry.kinds.insert(kind);
        }
        for profile in config.language {
            debug!(language = %profile.name, "configured language");
            registry.insert(profile);
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Add `profile`, replacing a language of the same name.
    pub fn insert(&mut self, mut profile: LanguageProfile) {
        if profile.support == ProfileSupport::Basic {
            profile.derive_comment_symbols();
        }
        match self
            .profiles
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&profile.name))
        {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.kinds.validate()?;
        for profile in &self.profiles {
            profile.validate(&self.kinds)?;
        }
        Ok(())
    }

    pub fn kinds(&self) -> &KindTable {
        &self.kinds
    }

    pub fn profiles(&self) -> &[LanguageProfile] {
        &self.profiles
    }

    pub fn by_name(&self, name: &str) -> Result<&LanguageProfile> {
        self.profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ProfileError::UnknownLanguage {
                name: name.to_string(),
            })
    }

    pub fn by_extension(&self, extension: &str) -> Result<&LanguageProfile> {
        self.profiles
            .iter()
            .find(|p| p.handles_extension(extension))
            .ok_or_else(|| ProfileError::UnsupportedExtension {
                extension: extension.to_string(),
            })
    }

    /// Language for a file, chosen by its extension.
    pub fn for_path(&self, path: &Path) -> Result<&LanguageProfile> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        self.by_extension(extension)
    }
}
