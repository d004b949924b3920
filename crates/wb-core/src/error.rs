/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when reading or reshaping entity data.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Entity or form JSON could not be encoded or decoded.
    #[error("invalid document data: {0}")]
    Json(#[from] serde_json::Error),

    /// A form field path runs through a field that already holds a plain value.
    #[error("form field \"{0}\" conflicts with a value at a parent path")]
    FormConflict(String),
}
