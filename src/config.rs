//! Engine configuration loaded from TOML
//!
//! One engine serves several deployments; each deployment is a config file
//! naming the corpus it loads and the language rules it uses.
//!
//! ```toml
//! [metadata]
//! name = "restaurants"
//!
//! [engine]
//! corpus = "restaurants.nlg"
//! possessive = "english"
//! max_depth = 16
//! strict = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::template::PossessiveRule;

/// Default limit on nested function calls during expansion
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Highest accepted nesting limit; deeper expansion would risk the thread's stack
pub const MAX_DEPTH_LIMIT: usize = 64;

/// Errors that can occur when loading or parsing configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("max_depth {0} exceeds the limit of {}", MAX_DEPTH_LIMIT)]
    DepthTooLarge(usize),
}

/// Settings for building an [`Engine`](crate::Engine)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Optional name for the deployment
    pub name: Option<String>,
    /// Optional description
    pub description: Option<String>,
    /// Corpus file, resolved against `base_path` when relative
    pub corpus: PathBuf,
    /// Rule used by the `genitive` builtin
    pub possessive: PossessiveRule,
    /// Limit on nested function calls
    pub max_depth: usize,
    /// Fail loading when the corpus has lint warnings
    pub strict: bool,
    /// Directory of the config file, for relative corpus paths
    pub base_path: Option<PathBuf>,
}

/// TOML structure for deserializing configs
#[derive(Deserialize)]
struct TomlConfig {
    metadata: Option<TomlMetadata>,
    engine: TomlEngine,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlEngine {
    corpus: PathBuf,
    #[serde(default)]
    possessive: PossessiveRule,
    max_depth: Option<usize>,
    #[serde(default)]
    strict: bool,
}

impl EngineConfig {
    /// Create a configuration for a corpus file with default settings
    pub fn new(corpus: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            description: None,
            corpus: corpus.into(),
            possessive: PossessiveRule::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            strict: false,
            base_path: None,
        }
    }

    /// Load configuration from a TOML file
    ///
    /// A relative corpus path is resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        config.base_path = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let max_depth = parsed.engine.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
        if max_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::DepthTooLarge(max_depth));
        }

        Ok(EngineConfig {
            name: parsed.metadata.as_ref().and_then(|m| m.name.clone()),
            description: parsed.metadata.as_ref().and_then(|m| m.description.clone()),
            corpus: parsed.engine.corpus,
            possessive: parsed.engine.possessive,
            max_depth,
            strict: parsed.engine.strict,
            base_path: None,
        })
    }

    /// Set the possessive rule
    pub fn with_possessive(mut self, rule: PossessiveRule) -> Self {
        self.possessive = rule;
        self
    }

    /// Set the nesting limit for function calls, capped at [`MAX_DEPTH_LIMIT`]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.min(MAX_DEPTH_LIMIT);
        self
    }

    /// Enable or disable strict linting
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the directory relative corpus paths are resolved against
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Full path of the corpus file
    pub fn corpus_path(&self) -> PathBuf {
        match &self.base_path {
            Some(base) if self.corpus.is_relative() => base.join(&self.corpus),
            _ => self.corpus.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = EngineConfig::from_str(
            r#"
[metadata]
name = "restaurants"
description = "Default wording"

[engine]
corpus = "restaurants.nlg"
possessive = "german"
max_depth = 4
strict = true
"#,
        )
        .unwrap();

        assert_eq!(config.name.as_deref(), Some("restaurants"));
        assert_eq!(config.description.as_deref(), Some("Default wording"));
        assert_eq!(config.corpus, PathBuf::from("restaurants.nlg"));
        assert_eq!(config.possessive, PossessiveRule::German);
        assert_eq!(config.max_depth, 4);
        assert!(config.strict);
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_str("[engine]\ncorpus = \"a.nlg\"\n").unwrap();
        assert_eq!(config.name, None);
        assert_eq!(config.possessive, PossessiveRule::English);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert!(!config.strict);
    }

    #[test]
    fn test_missing_corpus_is_error() {
        let result = EngineConfig::from_str("[engine]\nstrict = true\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_unknown_possessive_is_error() {
        let result = EngineConfig::from_str("[engine]\ncorpus = \"a.nlg\"\npossessive = \"klingon\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_max_depth_over_limit_is_error() {
        let result = EngineConfig::from_str("[engine]\ncorpus = \"a.nlg\"\nmax_depth = 100000\n");
        assert!(matches!(result, Err(ConfigError::DepthTooLarge(100000))));
        assert_eq!(EngineConfig::new("a.nlg").with_max_depth(usize::MAX).max_depth, MAX_DEPTH_LIMIT);
    }

    #[test]
    fn test_corpus_path_resolution() {
        let config = EngineConfig::new("corpora/a.nlg").with_base_path("/srv/nlg");
        assert_eq!(config.corpus_path(), PathBuf::from("/srv/nlg/corpora/a.nlg"));

        let config = EngineConfig::new("/abs/a.nlg").with_base_path("/srv/nlg");
        assert_eq!(config.corpus_path(), PathBuf::from("/abs/a.nlg"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::new("a.nlg")
            .with_possessive(PossessiveRule::German)
            .with_max_depth(3)
            .with_strict(true);
        assert_eq!(config.possessive, PossessiveRule::German);
        assert_eq!(config.max_depth, 3);
        assert!(config.strict);
    }
}
