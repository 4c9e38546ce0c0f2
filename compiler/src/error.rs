use thiserror::Error;

#[derive(Debug, Error)]
pub enum SbeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Schema invalid: {errors} error(s), {warnings} warning(s)")]
    Validation {
        errors:   usize,
        warnings: usize,
        messages: Vec<String>,
    },

    #[error("Invalid message header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported IR version {0}")]
    UnsupportedIrVersion(i32),

    #[error("IR decode error: {0}")]
    DecodeError(String),

    #[error("IR encode error: {0}")]
    EncodeError(String),

    #[error("Decode error: {0}")]
    OtfError(String),
}
