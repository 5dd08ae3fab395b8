use thiserror::Error;

/// Application-level error carrying the process exit code.
///
/// Exit codes:
/// - `2`: invalid input (flags, files, batch validation)
/// - `3`: nothing to process
/// - `4`: external collaborator or output failure
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Batch rejection reasons raised by the geo/validation core.
///
/// Every variant is terminal for the batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    #[error("Malformed geotransform: {0}")]
    MalformedTransform(String),

    #[error("Image pairs (pre/post) are incomplete or mismatched: {}", .unmatched.join(", "))]
    PairMismatch { unmatched: Vec<String> },

    #[error("Invalid metadata structure or image name mismatch: {0}")]
    MetadataShape(String),
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        AppError::new(2, err.to_string())
    }
}
