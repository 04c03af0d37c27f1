//! Vault error types.

/// Errors produced by password vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The master key is missing or not 32 bytes after decoding.
    #[error("invalid master key: {0}")]
    BadKey(String),

    /// The stored blob does not carry a cipher version this build knows.
    #[error("unsupported blob version {0:#04x}")]
    UnsupportedVersion(u8),

    /// The stored blob is too short to contain a nonce and tag.
    #[error("stored blob is truncated")]
    Truncated,

    /// Encryption or decryption failed (tampered data, wrong key).
    #[error("cipher error: {0}")]
    CipherError(String),

    /// Base64 decoding failed.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decrypted bytes are not valid UTF-8.
    #[error("decrypted password is not valid utf-8")]
    NotUtf8,
}

pub type Result<T> = std::result::Result<T, VaultError>;
