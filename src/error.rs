//! Error handler for otpvault.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OtpError>;

/// Enum representing every failure the core can report.
///
/// None of these are transient: retrying the same call with the same inputs
/// yields the same outcome, so callers reject the request or ask the user to
/// re-provision instead of looping.
#[derive(Debug, Error)]
pub enum OtpError {
    #[error("input is not valid base32")]
    InvalidEncoding,

    #[error("unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("digits must be between 6 and 8, got {0}")]
    InvalidDigits(u32),

    #[error("period must be between 15 and 300 seconds, got {0}")]
    InvalidPeriod(u64),

    #[error("verification window is capped at {max}, got {got}")]
    InvalidWindow { got: u8, max: u8 },

    #[error("secret must not be empty")]
    EmptySecret,

    #[error("secure random source is unavailable")]
    GenerationFailure,

    #[error("cipher could not seal the payload")]
    SealFailure,

    #[error("authentication tag does not verify")]
    AuthenticationFailure,

    #[error("malformed encrypted blob: {0}")]
    MalformedBlob(&'static str),

    #[error("missing encryption key, set the `{0}` environment variable")]
    MissingKey(&'static str),

    #[error("encryption key must be 64 hexadecimal characters")]
    InvalidKey,
}
