//! Optional settings file (TOML or YAML) providing defaults for a run

use std::path::Path;
use serde::Deserialize;

use crate::config::ShrinkConfigBuilder;
use crate::error::{Result, ShrinkError};

/// Defaults loaded from a settings file. Command-line flags override these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    /// Maximum width in pixels
    pub width: Option<u32>,

    /// Maximum height in pixels
    pub height: Option<u32>,

    /// Maximum width and height; `width`/`height` take precedence
    pub size: Option<u32>,

    /// Image extensions to search for
    pub extensions: Option<Vec<String>>,

    /// Path substrings to skip
    pub ignore: Option<Vec<String>>,

    /// JPEG output quality (1-100)
    pub quality: Option<u8>,

    /// Copy originals to `<path>.orig` before replacing them
    pub keep_originals: Option<bool>,
}

impl SettingsFile {
    /// Load settings from a `.toml`, `.yaml` or `.yml` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ShrinkError::config(format!(
                "Failed to read settings file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(ShrinkError::config(
                "Unsupported settings file format. Use .toml or .yaml",
            )),
        }
    }

    /// Apply these settings to a builder. Call before applying CLI flags.
    pub fn apply(&self, mut builder: ShrinkConfigBuilder) -> ShrinkConfigBuilder {
        if let Some(size) = self.size {
            builder = builder.size(size);
        }
        if let Some(width) = self.width {
            builder = builder.width(width);
        }
        if let Some(height) = self.height {
            builder = builder.height(height);
        }
        if let Some(extensions) = &self.extensions {
            builder = builder.extensions(extensions);
        }
        if let Some(ignore) = &self.ignore {
            builder = builder.ignore(ignore);
        }
        if let Some(quality) = self.quality {
            builder = builder.quality(quality);
        }
        if let Some(keep) = self.keep_originals {
            builder = builder.keep_originals(keep);
        }
        builder
    }
}
