use crate::issues::Repository;
use thiserror::Error;

/// A failure to tokenize or parse a query, with the 0-based character offset of the offending
/// token inside the query text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}")]
pub struct ParseError {
    message: String,
    position: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("repository {0} has more than one expression")]
    DuplicateRepository(Repository),
    #[error("more than one default expression")]
    DuplicateDefault,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read the configuration with {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to deserialize with {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid repository '{0}', expected 'owner/name'")]
    InvalidRepository(String),
    #[error("repository {0} has already been defined")]
    AlreadyPresent(Repository),
    #[error("query '{name}' refers to undefined repository {repository}")]
    UnknownRepository { name: String, repository: Repository },
    #[error("'{0}' has already been defined")]
    DuplicateName(String),
    #[error("query '{0}' has neither a query nor variants")]
    EmptyQuery(String),
    #[error("query '{name}': {source}")]
    Query {
        name: String,
        #[source]
        source: ParseError,
    },
    #[error("custom leaf '{name}': {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("query '{name}': {source}")]
    Construction {
        name: String,
        #[source]
        source: ConstructionError,
    },
}
