use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type PipelineResult<T, E = PipelineError> = Result<T, E>;

/// Exit code for a malformed command line.
pub const USAGE_EXIT_CODE: u8 = 1;
/// Exit code for every failure after argument parsing.
pub const FAILURE_EXIT_CODE: u8 = 2;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("missing column `{column}` ({context})")]
    Schema { column: String, context: String },

    #[error("row {row}, column `{column}`: cannot parse {value:?} as {expected}")]
    Parse {
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error on {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Usage(_) => USAGE_EXIT_CODE,
            _ => FAILURE_EXIT_CODE,
        }
    }
}
