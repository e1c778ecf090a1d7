//! nlg-templates - template-based response generation for dialogue systems
//!
//! A corpus maps dialogue acts such as `inform_byname` or `request` to
//! response patterns with conditional branches and special cases. The
//! [`Engine`] loads a corpus once and resolves invocations from a dialogue
//! manager into finished text.
//!
//! # Example
//!
//! ```rust
//! use nlg_templates::{Engine, Invocation};
//!
//! let engine = Engine::from_source(r#"
//!     template inform_byname(name): "I found {name}."
//!         special_case name = "none": "I'm sorry, I could not find it."
//! "#).unwrap();
//!
//! let text = engine.resolve(&Invocation::new("inform_byname").with("name", "none")).unwrap();
//! assert_eq!(text, "I'm sorry, I could not find it.");
//! ```

pub mod config;
pub mod error;
pub mod lint;
pub mod parser;
pub mod template;

use std::path::PathBuf;

pub use config::{ConfigError, EngineConfig};
pub use error::ParseError;
pub use lint::{LintCategory, LintWarning};
pub use parser::{parse, parse_pattern, Corpus};
pub use template::{
    Bindings, EnglishPossessive, GermanPossessive, Invocation, Possessive, PossessiveRule,
    ResolveError, Resolver, SlotValue, TemplateError, TemplateRegistry, Value,
};

use thiserror::Error;

/// Errors that can occur while loading a corpus
#[derive(Debug, Error)]
pub enum LoadError {
    /// Error during parsing
    #[error("parse errors: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    /// Corpus parsed but its definitions are inconsistent
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Configuration could not be read
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Corpus file could not be read
    #[error("failed to read corpus {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Strict mode rejected a corpus with lint warnings
    #[error("lint warnings: {}", format_lint_warnings(.0))]
    Lint(Vec<LintWarning>),
}

impl From<Vec<ParseError>> for LoadError {
    fn from(errors: Vec<ParseError>) -> Self {
        LoadError::Parse(errors)
    }
}

impl LoadError {
    /// Format parse and template errors with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            LoadError::Parse(errors) => errors
                .iter()
                .map(|e| e.format(source, filename))
                .collect::<Vec<_>>()
                .join("\n"),
            LoadError::Template(e) => e.format(source, filename),
            other => other.to_string(),
        }
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_lint_warnings(warnings: &[LintWarning]) -> String {
    warnings
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A loaded corpus ready to resolve invocations
///
/// Immutable after construction; share it freely between threads.
#[derive(Debug)]
pub struct Engine {
    registry: TemplateRegistry,
    possessive: Box<dyn Possessive>,
    max_depth: usize,
}

impl Engine {
    /// Parse and register a corpus with default settings
    pub fn from_source(source: &str) -> Result<Self, LoadError> {
        let corpus = parse(source)?;
        let registry = TemplateRegistry::from_corpus(&corpus)?;
        tracing::debug!(
            templates = registry.template_count(),
            functions = registry.function_count(),
            "loaded template corpus"
        );
        Ok(Self {
            registry,
            possessive: Box::new(EnglishPossessive),
            max_depth: config::DEFAULT_MAX_DEPTH,
        })
    }

    /// Load the corpus named by a configuration and apply its settings
    pub fn from_config(config: &EngineConfig) -> Result<Self, LoadError> {
        let path = config.corpus_path();
        let source = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;

        let engine = Self::from_source(&source)?
            .with_possessive(config.possessive.build())
            .with_max_depth(config.max_depth);

        let warnings = engine.lint();
        if !warnings.is_empty() {
            if config.strict {
                return Err(LoadError::Lint(warnings));
            }
            for warning in &warnings {
                tracing::warn!(corpus = %path.display(), "{}", warning);
            }
        }

        tracing::debug!(
            corpus = %path.display(),
            deployment = config.name.as_deref().unwrap_or("<unnamed>"),
            "engine ready"
        );
        Ok(engine)
    }

    /// Read a TOML config file and load the engine it describes
    pub fn from_config_file(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let path: PathBuf = path.into();
        let config = EngineConfig::from_file(&path)?;
        Self::from_config(&config)
    }

    /// Replace the rule used by `genitive`
    pub fn with_possessive(mut self, possessive: Box<dyn Possessive>) -> Self {
        self.possessive = possessive;
        self
    }

    /// Set the limit on nested function calls, capped at [`config::MAX_DEPTH_LIMIT`]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        if depth > config::MAX_DEPTH_LIMIT {
            tracing::warn!(
                requested = depth,
                limit = config::MAX_DEPTH_LIMIT,
                "nesting limit capped"
            );
        }
        self.max_depth = depth.min(config::MAX_DEPTH_LIMIT);
        self
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.registry, self.possessive.as_ref(), self.max_depth)
    }

    /// Resolve an invocation to its finished text
    pub fn resolve(&self, invocation: &Invocation) -> Result<String, ResolveError> {
        self.resolver().resolve(invocation)
    }

    /// Call a builtin or corpus function directly
    pub fn call_function(&self, name: &str, args: Vec<Value>) -> Result<Value, ResolveError> {
        self.resolver().call(name, args)
    }

    /// Expand an ad-hoc pattern against explicit bindings
    pub fn expand(&self, pattern: &str, bindings: &Bindings) -> Result<String, ExpandError> {
        let pattern = parse_pattern(pattern).map_err(ExpandError::Parse)?;
        Ok(self.resolver().expand(&pattern, bindings)?)
    }

    /// Lint the loaded corpus
    pub fn lint(&self) -> Vec<LintWarning> {
        lint::check(&self.registry)
    }
}

/// Errors from expanding an ad-hoc pattern
#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("parse errors: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
