/// Broad classification of a [`ScanError`], used by the orchestrator to
/// decide between aborting a scan and skipping the failing batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential rejected by the provider. Aborts the whole scan.
    Auth,
    /// Non-success response or network failure scoped to one page/expiration.
    TransientFetch,
    /// A single record could not be normalized.
    Parse,
    /// The caller supplied an unusable request or configuration.
    InvalidArgument,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Unauthorized ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "table")]
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ScanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::Auth { .. } => ErrorKind::Auth,
            ScanError::Parse(_) => ErrorKind::Parse,
            ScanError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            _ => ErrorKind::TransientFetch,
        }
    }

    /// Only an authentication failure terminates a scan outright.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
