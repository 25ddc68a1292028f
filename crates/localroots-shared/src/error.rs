use thiserror::Error;

/// Failures when decoding or verifying an [`crate::token::AuthToken`].
#[derive(Error, Debug)]
pub enum TokenError {
    /// The encoded token is not valid base64 / JSON.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The signature does not match the claims, or was produced by a
    /// different signing key.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// The token's `expires_at` is in the past.
    #[error("Token expired")]
    Expired,
}
