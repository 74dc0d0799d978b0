/// Errors during mesh or configuration loading.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("failed to parse file: {0}")]
    ParseError(String),

    #[error("unknown file format: {0}")]
    UnknownFormat(String),

    #[error("format {format} is not supported by this build")]
    Unsupported { format: String },

    #[error("file version {file_version} is newer than supported version {supported_version}")]
    FutureVersion {
        file_version: u32,
        supported_version: u32,
    },

    #[error("migration failed from version {from} to {to}: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },

    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Errors during hybrid mesh export.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExportError {
    #[error("format {format} is not supported by this build")]
    Unsupported { format: String },

    #[error("serialization failed: {0}")]
    Serialize(String),

    #[error("cannot write {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Errors in the configuration file.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("line {line}: expected 'key = value', got: {text}")]
    Malformed { line: usize, text: String },

    #[error("option {key}: cannot parse {value:?} as {expected}")]
    BadValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },
}
