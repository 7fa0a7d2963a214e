//! Shared configuration loader for the svfmt toolchain.
//!
//! `defaults/svfmt.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`SvfmtConfig`],
//! then convert to the engine's [`FormatStyle`] with
//! [`StyleConfig::to_format_style`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;
use svfmt_core::FormatStyle;

const DEFAULT_TOML: &str = include_str!("../defaults/svfmt.default.toml");

/// Top-level configuration consumed by svfmt applications.
#[derive(Debug, Clone, Deserialize)]
pub struct SvfmtConfig {
    pub style: StyleConfig,
    pub search: SearchConfig,
}

/// Mirrors the knobs exposed by the formatting engine.
#[derive(Debug, Clone, Deserialize)]
pub struct StyleConfig {
    pub column_limit: usize,
    pub indentation_spaces: usize,
    pub wrap_spaces: usize,
    pub over_column_limit_penalty: i64,
    pub max_blank_lines: usize,
    pub format_module_port_declarations: bool,
}

impl StyleConfig {
    pub fn to_format_style(&self) -> FormatStyle {
        FormatStyle {
            column_limit: self.column_limit,
            indentation_spaces: self.indentation_spaces,
            wrap_spaces: self.wrap_spaces,
            over_column_limit_penalty: self.over_column_limit_penalty,
            max_blank_lines: self.max_blank_lines,
            format_module_port_declarations: self.format_module_port_declarations,
        }
    }
}

/// Wrap-search resource limits.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub max_search_states: usize,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<SvfmtConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<SvfmtConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.style.column_limit, 100);
        assert_eq!(config.style.indentation_spaces, 2);
        assert_eq!(config.search.max_search_states, 100_000);
        assert!(config.style.format_module_port_declarations);
    }

    #[test]
    fn defaults_match_engine_defaults() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.style.to_format_style(), FormatStyle::default());
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("style.column_limit", 80i64)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.style.column_limit, 80);
    }
}
