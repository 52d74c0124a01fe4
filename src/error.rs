//! Error taxonomy (§7). Configuration and argument errors are fatal at
//! startup; everything else is either a per-candidate event the dispatcher
//! absorbs, or an I/O error surfaced as a minimal `FileResult`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ini::ParseError,
    },
    #[error("missing [configuration] section")]
    MissingSection,
    #[error("missing required key 'baseunpackdirectory'")]
    MissingBaseUnpackDirectory,
    #[error("baseunpackdirectory {0} does not exist")]
    BaseUnpackDirectoryMissing(String),
    #[error("baseunpackdirectory {0} is not a directory")]
    BaseUnpackDirectoryNotADirectory(String),
    #[error("baseunpackdirectory {0} is not writable: {1}")]
    BaseUnpackDirectoryNotWritable(String, std::io::Error),
    #[error("invalid 'threads' value '{0}': must be a non-negative integer")]
    InvalidThreads(String),
}

#[derive(Debug, Error)]
pub enum ArgError {
    #[error("input file {0} does not exist or is not a regular file")]
    InputNotARegularFile(String),
    #[error("config file {0} does not exist or is not a regular file")]
    ConfigNotARegularFile(String),
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Arg(#[from] ArgError),
    #[error("failed to prepare the staging area or run log: {0}")]
    Staging(#[from] std::io::Error),
}

impl StartupError {
    /// Maps an error to the process exit status mandated by §7/§4.8.
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::Config(_) | StartupError::Arg(_) => 2,
            StartupError::Staging(_) => 1,
        }
    }
}
