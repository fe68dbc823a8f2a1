//! Unified error types and result handling.

use thiserror::Error;

/// Errors produced by the receipt-splitter library.
///
/// The parsing and balance core never fails: malformed OCR lines are dropped
/// and invalid edits are no-ops. These variants cover the operations that can
/// genuinely fail, such as spawning the OCR process, reading configuration,
/// or writing an export file.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR error: {message}")]
    Ocr { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Roommate not found: {name}")]
    RoommateNotFound { name: String },
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
