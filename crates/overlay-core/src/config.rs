//! Editor configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file)
//! is a valid configuration.

use crate::error::OverlayError;
use crate::metrics::StandardFont;
use crate::persistence::DEFAULT_NAMESPACE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Text of a freshly added overlay
    pub default_text: String,
    /// Color of a freshly added overlay
    pub default_color: String,
    /// Standard 14 font used for every exported overlay
    pub font_name: String,
    /// Default font size as a fraction of page width, before clamping
    pub default_font_ratio: f64,
    pub default_font_min: f64,
    pub default_font_max: f64,
    /// Range accepted for user font size edits
    pub font_size_min: f64,
    pub font_size_max: f64,
    /// Prefix for persistence keys
    pub storage_namespace: String,
    /// Appended to the source file stem when naming the export
    pub output_suffix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_text: "New Text".to_string(),
            default_color: "#000000".to_string(),
            font_name: "Helvetica".to_string(),
            default_font_ratio: 0.02,
            default_font_min: 12.0,
            default_font_max: 24.0,
            font_size_min: 8.0,
            font_size_max: 72.0,
            storage_namespace: DEFAULT_NAMESPACE.to_string(),
            output_suffix: "-annotated".to_string(),
        }
    }
}

impl EditorConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed,
    /// or the values are inconsistent
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, OverlayError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            OverlayError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, OverlayError> {
        let config: Self = toml::from_str(s).map_err(|e| OverlayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The configured overlay font
    pub fn font(&self) -> Result<StandardFont, OverlayError> {
        StandardFont::from_name(&self.font_name).ok_or_else(|| {
            OverlayError::Config(format!("{} is not a standard PDF font", self.font_name))
        })
    }

    pub fn validate(&self) -> Result<(), OverlayError> {
        self.font()?;
        if !(self.font_size_min > 0.0 && self.font_size_min <= self.font_size_max) {
            return Err(OverlayError::Config(format!(
                "font size range {}..{} is empty",
                self.font_size_min, self.font_size_max
            )));
        }
        if !(self.default_font_min > 0.0 && self.default_font_min <= self.default_font_max) {
            return Err(OverlayError::Config(format!(
                "default font size range {}..{} is empty",
                self.default_font_min, self.default_font_max
            )));
        }
        if self.storage_namespace.is_empty() {
            return Err(OverlayError::Config(
                "storage_namespace must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Font size for a new overlay on a page `page_width` points wide
    pub fn default_font_size(&self, page_width: f64) -> f64 {
        (page_width * self.default_font_ratio)
            .round()
            .clamp(self.default_font_min, self.default_font_max)
    }

    /// Clamp a user font size into range. NaN maps to the minimum.
    pub fn clamp_font_size(&self, size: f64) -> f64 {
        if size.is_nan() {
            return self.font_size_min;
        }
        size.clamp(self.font_size_min, self.font_size_max)
    }
}
