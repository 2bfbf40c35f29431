//! Operator-facing error codes.
//!
//! Every service error carries a stable, grepable code and a retryable flag.
//! Codes are written to logs only; HTTP clients never see them.

/// Grepable error code and retryable flag for structured error logging.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
