//! Error types for parsing, transforming and rendering.

use thiserror::Error;

/// Errors raised while building a [`Document`](crate::Document) in strict mode.
///
/// Lenient parsing never fails: the offending markers are kept as literal text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// An opening marker names a tag the registry cannot resolve.
    #[error("unknown tag [{name}] at position {position}")]
    UnknownTag { name: String, position: usize },

    /// A closing marker does not match any currently open tag.
    #[error("closing tag [/{name}] at position {position} does not match any open tag")]
    UnmatchedClose { name: String, position: usize },

    /// A closing marker matches an enclosing tag while `open`, which needs
    /// its own closing marker, is still open inside it.
    #[error("closing tag [/{name}] at position {position} leaves [{open}] unclosed")]
    MismatchedClose {
        name: String,
        open: String,
        position: usize,
    },
}

/// Errors raised by a [`TagRenderer`](crate::TagRenderer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Template compilation or evaluation failure.
    #[error("template error: {0}")]
    Template(String),

    /// Any other renderer failure.
    #[error("{0}")]
    Failed(String),
}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        RenderError::Template(err.to_string())
    }
}

/// Errors that abort a transform. No partial output is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// Strict mode and no renderer is registered for an accepted tag.
    #[error("no renderer found for tag [{tag}]")]
    MissingRenderer { tag: String },

    /// The renderer for `tag` failed.
    #[error("render failed for tag [{tag}]: {source}")]
    Render {
        tag: String,
        #[source]
        source: RenderError,
    },
}

/// Errors loading a [`TagRegistry`](crate::TagRegistry) from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid tag registry: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
