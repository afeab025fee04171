//! Error types shared by every layer of the parser.
//!
//! Line-level failures during [`process`](crate::haconf::engine::ConfigParser::process)
//! never surface here: a line no directive accepts is kept verbatim by the catch-all
//! parser. These errors come back from the accessor API, the sorter and `save`.

use std::io;

/// Errors returned by the accessor API, the sorter and the writer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A section kind+name pair that is not in the registry.
    #[error("section missing: {0}")]
    SectionMissing(String),

    /// A section kind that is not known, or that the operation does not accept.
    #[error("section type missing: {0}")]
    SectionTypeMissing(String),

    /// `sections_create` on a name that is already taken within the kind.
    #[error("section already exists: {0}")]
    SectionAlreadyExists(String),

    /// The section kind has no directive registered under this keyword.
    #[error("attribute not found: {0}")]
    AttributeNotFound(String),

    /// The section instance holds no parser for this keyword.
    #[error("parser missing: {0}")]
    ParserMissing(String),

    /// The directive exists but holds no value at the requested position.
    #[error("no data")]
    Fetch,

    /// Well tokenized input that the directive cannot accept.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A directive parser rejected a line.
    #[error("{parser}: cannot parse '{line}': {message}")]
    Parse {
        parser: String,
        line: String,
        message: String,
    },

    /// A `from` edge names a defaults section that does not exist.
    #[error("defaults section missing: {0}")]
    FromDefaultsSectionMissing(String),

    /// The `from` edges of the defaults sections loop back on themselves.
    #[error("circular dependency on defaults section: {0}")]
    CircularDependency(String),

    /// Releasing the advisory lock taken by `save` failed.
    #[error("cannot release lock: {0}")]
    Unlock(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn parse(parser: &str, line: &str, message: impl Into<String>) -> Self {
        Error::Parse {
            parser: parser.to_string(),
            line: line.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
