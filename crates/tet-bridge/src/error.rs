use std::path::PathBuf;

/// Errors from the external mesher interface. All of these are fatal for
/// the current run.
#[derive(Debug, thiserror::Error)]
pub enum TetError {
    #[error("boundary complex is invalid: {reason}")]
    InvalidPlc { reason: String },

    #[error("call to the tet mesher failed: {message}")]
    TetgenFailed { message: String },

    #[error("expected mesher output file is missing: {path}")]
    MissingOutput { path: PathBuf },

    #[error("malformed mesher output {path}, line {line}: {reason}")]
    MalformedOutput {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
