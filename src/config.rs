use crate::level::LintLevel;
use crate::lint::FixSettings;
use crate::naming::DEFAULT_BINDING_PREFIX;
use crate::rewrite::is_identifier;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct WithoutConfig {
    #[serde(default)]
    pub lints: LintsConfig,

    #[serde(default)]
    pub fix: FixConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct LintsConfig {
    #[serde(default)]
    pub disabled: Vec<String>,

    #[serde(flatten)]
    pub levels: HashMap<String, LintLevel>,
}

/// `[fix]` table: how replacement code is written.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FixConfig {
    pub binding_prefix: String,
    pub type_hints: bool,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            binding_prefix: DEFAULT_BINDING_PREFIX.to_string(),
            type_hints: true,
        }
    }
}

impl FixConfig {
    /// Validated fix settings.
    ///
    /// # Errors
    ///
    /// Fails when `binding_prefix` cannot start an identifier.
    pub fn to_settings(&self) -> Result<FixSettings> {
        if !is_identifier(&format!("{}1", self.binding_prefix)) {
            bail!(
                "invalid fix.binding_prefix `{}`: generated names must be identifiers",
                self.binding_prefix
            );
        }
        Ok(FixSettings {
            binding_prefix: self.binding_prefix.clone(),
            type_hints: self.type_hints,
        })
    }
}

pub const DEFAULT_CONFIG_FILE_NAME: &str = "without.toml";

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut cur = Some(start_dir);
    while let Some(dir) = cur {
        let candidate = dir.join(DEFAULT_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

pub fn load_config_file(path: &Path) -> Result<WithoutConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let cfg: WithoutConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(cfg)
}

pub fn load_config(
    explicit_path: Option<&Path>,
    start_dir: &Path,
) -> Result<Option<(PathBuf, WithoutConfig)>> {
    if let Some(p) = explicit_path {
        let cfg = load_config_file(p)?;
        return Ok(Some((p.to_path_buf(), cfg)));
    }

    let Some(p) = find_config_file(start_dir) else {
        return Ok(None);
    };
    let cfg = load_config_file(&p)?;
    Ok(Some((p, cfg)))
}
