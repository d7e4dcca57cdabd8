//! [`EncryptionKey`]: the process-wide AES-256 key derived from the operator secret.

use std::fmt;

use common::CodecError;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Fixed-size key buffer holding exactly [`KEY_LEN`] bytes.
///
/// Immutable once built. The memory is overwritten with zeroes on drop, and the
/// type is deliberately not `Clone`: share it through an `Arc`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Derive the key as the SHA-256 digest of `secret`.
    ///
    /// The raw secret is never used as key material, so any secret length
    /// yields a full-strength 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MissingKeyConfiguration`] if `secret` is empty or
    /// whitespace only.
    pub fn derive(secret: &str) -> Result<Self, CodecError> {
        if secret.trim().is_empty() {
            return Err(CodecError::MissingKeyConfiguration(
                "encryption secret must not be empty".into(),
            ));
        }
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&digest);
        Ok(Self(key))
    }

    /// Wrap key material that has already been derived elsewhere.
    pub fn from_bytes(key: [u8; KEY_LEN]) -> Self {
        Self(key)
    }

    /// Borrow the raw key bytes. Use immediately; do not store the slice.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, even in debug builds.
        f.write_str("EncryptionKey([REDACTED])")
    }
}
