//! Layered configuration.
//!
//! `defaults/lexsig.default.toml` is embedded into the binary so that docs and runtime
//! behavior stay in sync. Applications layer user files and single-key overrides on top of
//! those defaults via [`Loader`] before deserializing into [`LexsigConfig`].

use crate::extraction::ExtractorOptions;
use crate::formats::MarkdownOptions;
use crate::lexing::LexerOptions;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/lexsig.default.toml");

/// File picked up from the working directory when present.
pub const USER_CONFIG_FILE: &str = "lexsig.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct LexsigConfig {
    pub lexer: LexerOptions,
    pub extractor: ExtractorOptions,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Name of the formatter used when none is given on the command line.
    pub format: String,
    pub markdown: MarkdownOptions,
}

/// Builds a [`LexsigConfig`] from the embedded defaults plus whatever the caller stacks on top.
/// Later layers win key by key.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Only `defaults/lexsig.default.toml`.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// A TOML file given by the user, e.g. `--config`. `build` fails if it does not exist.
    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.layer_file(path.as_ref(), true)
    }

    /// A TOML file that may be absent, such as `./lexsig.toml`.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Self {
        self.layer_file(path.as_ref(), false)
    }

    fn layer_file(mut self, path: &Path, required: bool) -> Self {
        let file = File::from(path).format(FileFormat::Toml).required(required);
        self.builder = self.builder.add_source(file);
        self
    }

    /// TOML text that need not be a complete config: only the keys it sets are replaced, so a
    /// single `[extractor]` table leaves the lexer and output sections at their defaults.
    pub fn with_toml(mut self, toml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(toml, FileFormat::Toml));
        self
    }

    /// Set one dotted key such as `lexer.max_state_depth`, above every file layer.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge the layers and deserialize them. Unknown keys are ignored; ill-typed values are
    /// errors.
    pub fn build(self) -> Result<LexsigConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// The built-in settings, as the library uses them when no config is given.
pub fn load_defaults() -> Result<LexsigConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FunctionStyle;

    #[test]
    fn test_defaults_match_runtime_defaults() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.lexer, LexerOptions::default());
        assert_eq!(config.extractor, ExtractorOptions::default());
        assert_eq!(config.output.format, "text");
        assert_eq!(config.output.markdown, MarkdownOptions::default());
    }

    #[test]
    fn test_overrides() {
        let config = Loader::new()
            .set_override("lexer.max_state_depth", 8i64)
            .expect("override to apply")
            .set_override("output.markdown.function_style", "callout")
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.lexer.max_state_depth, 8);
        assert_eq!(config.output.markdown.function_style, FunctionStyle::Callout);
    }

    #[test]
    fn test_toml_layer_is_partial() {
        let config = Loader::new()
            .with_toml("[extractor]\ninclude_declarations = false\n")
            .build()
            .expect("config to build");
        assert!(!config.extractor.include_declarations);
        assert_eq!(config.extractor.lookback, 8);
    }

    #[test]
    fn test_missing_optional_file_is_ignored() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/lexsig.toml")
            .build()
            .expect("config to build");
        assert_eq!(config.output.format, "text");
    }

    #[test]
    fn test_missing_required_file_fails() {
        assert!(Loader::new()
            .with_file("/nonexistent/lexsig.toml")
            .build()
            .is_err());
    }
}
