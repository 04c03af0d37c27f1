//! At-rest encryption for relay passwords.
//!
//! Passwords are sealed with XChaCha20-Poly1305 under a single master key
//! and bound to their owner's user id as associated data, so a blob copied
//! between settings rows fails to open.
//!
//! Blob layout (base64 encoded for storage):
//! `[version: 1 byte][nonce: 24 bytes][ciphertext + Poly1305 tag: N + 16 bytes]`.

pub mod error;

#[allow(deprecated)] // upstream generic-array 0.x deprecation
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use {
    base64::{Engine as _, engine::general_purpose::STANDARD as BASE64},
    rand::RngCore,
    zeroize::Zeroizing,
};

use chatrelay_common::UserId;

pub use error::{Result, VaultError};

/// Version tag for the XChaCha20-Poly1305 blob format.
pub const VERSION_TAG: u8 = 0x01;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;

/// Seals and opens relay passwords under one 32-byte master key.
pub struct PasswordVault {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl std::fmt::Debug for PasswordVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordVault").finish_non_exhaustive()
    }
}

impl PasswordVault {
    /// Builds a vault from a base64-encoded 32-byte master key.
    pub fn from_base64_key(encoded: &str) -> Result<Self> {
        let raw = BASE64.decode(encoded.trim())?;
        let key: [u8; KEY_LEN] = raw
            .try_into()
            .map_err(|_| VaultError::BadKey(format!("expected {KEY_LEN} bytes")))?;
        Ok(Self { key: Zeroizing::new(key) })
    }

    /// Encrypts a password for storage, returning a base64 blob.
    #[allow(deprecated)]
    pub fn encrypt(&self, user_id: &UserId, password: &str) -> Result<String> {
        let cipher = XChaCha20Poly1305::new((&*self.key).into());

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, Payload {
                msg: password.as_bytes(),
                aad: user_id.as_str().as_bytes(),
            })
            .map_err(|e| VaultError::CipherError(e.to_string()))?;

        let mut blob = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        blob.push(VERSION_TAG);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(blob))
    }

    /// Decrypts a stored base64 blob back into the password.
    #[allow(deprecated)]
    pub fn decrypt(&self, user_id: &UserId, encoded: &str) -> Result<Zeroizing<String>> {
        let blob = BASE64.decode(encoded.trim())?;
        if blob.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(VaultError::Truncated);
        }
        if blob[0] != VERSION_TAG {
            return Err(VaultError::UnsupportedVersion(blob[0]));
        }

        let (nonce_bytes, ct) = blob[1..].split_at(NONCE_LEN);
        let nonce = XNonce::from_slice(nonce_bytes);
        let cipher = XChaCha20Poly1305::new((&*self.key).into());

        let plaintext = cipher
            .decrypt(nonce, Payload {
                msg: ct,
                aad: user_id.as_str().as_bytes(),
            })
            .map_err(|e| VaultError::CipherError(e.to_string()))?;

        String::from_utf8(plaintext)
            .map(Zeroizing::new)
            .map_err(|_| VaultError::NotUtf8)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> PasswordVault {
        PasswordVault::from_base64_key(&BASE64.encode([0x42u8; 32])).unwrap()
    }

    #[test]
    fn round_trip() {
        let vault = vault();
        let user = UserId::new("u-1");

        let blob = vault.encrypt(&user, "hunter2").unwrap();
        let back = vault.decrypt(&user, &blob).unwrap();
        assert_eq!(back.as_str(), "hunter2");
    }

    #[test]
    fn wrong_key_fails() {
        let vault1 = vault();
        let vault2 = PasswordVault::from_base64_key(&BASE64.encode([0x43u8; 32])).unwrap();
        let user = UserId::new("u-1");

        let blob = vault1.encrypt(&user, "hunter2").unwrap();
        assert!(vault2.decrypt(&user, &blob).is_err());
    }

    #[test]
    fn blob_is_bound_to_its_user() {
        let vault = vault();
        let blob = vault.encrypt(&UserId::new("u-1"), "hunter2").unwrap();
        assert!(vault.decrypt(&UserId::new("u-2"), &blob).is_err());
    }

    #[test]
    fn tampered_blob_fails() {
        let vault = vault();
        let user = UserId::new("u-1");

        let blob = vault.encrypt(&user, "hunter2").unwrap();
        let mut raw = BASE64.decode(&blob).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        assert!(vault.decrypt(&user, &BASE64.encode(raw)).is_err());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let vault = vault();
        let user = UserId::new("u-1");

        let blob = vault.encrypt(&user, "hunter2").unwrap();
        let mut raw = BASE64.decode(&blob).unwrap();
        raw[0] = 0x7f;
        let err = vault.decrypt(&user, &BASE64.encode(raw)).unwrap_err();
        assert!(matches!(err, VaultError::UnsupportedVersion(0x7f)));
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let vault = vault();
        let err = vault
            .decrypt(&UserId::new("u-1"), &BASE64.encode([VERSION_TAG; 10]))
            .unwrap_err();
        assert!(matches!(err, VaultError::Truncated));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let vault = vault();
        assert!(matches!(
            vault.decrypt(&UserId::new("u-1"), "not base64!!!"),
            Err(VaultError::Base64(_))
        ));
    }

    #[test]
    fn short_master_key_is_rejected() {
        let err = PasswordVault::from_base64_key(&BASE64.encode([1u8; 16])).unwrap_err();
        assert!(matches!(err, VaultError::BadKey(_)));
    }

    #[test]
    fn same_password_encrypts_to_different_blobs() {
        let vault = vault();
        let user = UserId::new("u-1");

        let blob1 = vault.encrypt(&user, "hunter2").unwrap();
        let blob2 = vault.encrypt(&user, "hunter2").unwrap();
        assert_ne!(blob1, blob2);
    }
}
