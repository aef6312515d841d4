use std::path::PathBuf;

/// Result alias for `evoclus`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by graph construction, the engine driver and file readers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed adjacency: length mismatch, out-of-range index, asymmetry.
    #[error("invalid graph: {reason}")]
    InvalidGraph { reason: String },

    /// Caller-supplied parameter outside its domain.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        name: &'static str,
        message: String,
    },

    #[error("error reading '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("failed to build island thread pool: {0}")]
    ThreadPool(String),
}

impl Error {
    pub(crate) fn invalid_graph(reason: impl Into<String>) -> Self {
        Error::InvalidGraph {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}
