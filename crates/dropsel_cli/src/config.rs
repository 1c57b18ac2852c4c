//! Replay configuration file handling
//!
//! A `dropsel.toml` describes the dropdowns on one screen and an optional
//! script to replay against them:
//!
//! ```toml
//! script = ["country open", "country search ger", "country select"]
//!
//! [[dropdown]]
//! name = "country"
//! searchable = true
//! options_file = "countries.json"
//!
//! [[dropdown]]
//! name = "size"
//! config_file = "size.json"
//! ```
//!
//! `config_file` loads the whole dropdown config from a standalone `.toml` or
//! `.json` file; inline keys of that table are then ignored.

use anyhow::{Context, Result};
use dropsel_select::DropdownConfig;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level replay file
#[derive(Debug, Deserialize)]
pub struct ReplayFile {
    #[serde(default, rename = "dropdown")]
    pub dropdowns: Vec<DropdownEntry>,
    /// Steps of the form `"<name> <command> [arg]"`
    #[serde(default)]
    pub script: Vec<String>,
}

/// One `[[dropdown]]` table
#[derive(Debug, Deserialize)]
pub struct DropdownEntry {
    pub name: String,
    /// Standalone dropdown config, relative to the replay file
    #[serde(default)]
    pub config_file: Option<PathBuf>,
    /// JSON array supplying `content`, relative to the replay file
    #[serde(default)]
    pub options_file: Option<PathBuf>,
    #[serde(flatten)]
    pub config: DropdownConfig,
}

impl ReplayFile {
    /// Load a replay file and resolve its `config_file` and `options_file`
    /// references
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut file = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for entry in &mut file.dropdowns {
            entry.resolve_config(base)?;
            entry.resolve_options(base)?;
        }
        Ok(file)
    }

    /// Parse without touching the filesystem
    pub fn parse(content: &str) -> Result<Self> {
        let file: ReplayFile = toml::from_str(content)?;

        let mut seen = std::collections::HashSet::new();
        for entry in &file.dropdowns {
            if !seen.insert(entry.name.as_str()) {
                anyhow::bail!("Duplicate dropdown name '{}'", entry.name);
            }
            if entry.name.contains(char::is_whitespace) {
                anyhow::bail!("Dropdown name '{}' must not contain whitespace", entry.name);
            }
        }
        Ok(file)
    }
}

impl DropdownEntry {
    fn resolve_config(&mut self, base: &Path) -> Result<()> {
        let Some(config_file) = &self.config_file else {
            return Ok(());
        };
        let path = base.join(config_file);
        self.config = DropdownConfig::from_path(&path)
            .with_context(|| format!("Failed to load dropdown config {}", path.display()))?;
        tracing::debug!("{}: config loaded from {}", self.name, path.display());
        Ok(())
    }

    fn resolve_options(&mut self, base: &Path) -> Result<()> {
        let Some(options_file) = &self.options_file else {
            return Ok(());
        };
        let path = base.join(options_file);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let records: Vec<Value> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {} as a JSON array", path.display()))?;

        if self.config.content.is_some() {
            tracing::warn!(
                "{}: options_file overrides inline content ({})",
                self.name,
                path.display()
            );
        }
        self.config.content = Some(records);
        Ok(())
    }
}
