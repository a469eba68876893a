//! Error type shared by the reader, the writer and the summary helpers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The log file does not exist.
    #[error("log file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but is not a log we understand.
    #[error("not a recognized darshan log: {0}")]
    Format(String),

    /// The module name is valid but nothing was recorded for it in this log.
    #[error("module {0} is not present in this log")]
    ModuleNotPresent(String),

    /// The module was recorded but holds zero records.
    #[error("module {0} is present but has no records")]
    EmptyRecord(String),

    /// Decoded data disagrees with the module registry.
    #[error("{module} {what}: expected {expected}, found {found}")]
    Schema {
        module: String,
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// The handle was used after `close`.
    #[error("log handle used after close")]
    UseAfterClose,

    /// No record schema ships for this module name.
    #[error("unknown module: {0}")]
    UnknownModule(String),

    /// The operation has no meaning for this module.
    #[error("{what} is not available for module {module}")]
    Unsupported { module: String, what: &'static str },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn format<S: Into<String>>(msg: S) -> Error {
        Error::Format(msg.into())
    }
}
