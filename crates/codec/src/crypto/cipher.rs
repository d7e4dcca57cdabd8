//! AES-256-GCM encryption and decryption of individual column values.
//!
//! Every call to [`encrypt`] draws a fresh 96-bit nonce from the OS CSPRNG.
//! Callers can neither supply nor observe-then-reuse a nonce: GCM nonce reuse
//! under one key breaks both confidentiality and authentication.

use std::{fmt, str::FromStr, sync::Arc};

use aes_gcm::{
    aead::{AeadCore, AeadInPlace, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce, Tag,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{CodecError, LogicalType};

use super::key::EncryptionKey;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Fixed header length: `nonce || tag`. Any shorter blob is malformed.
pub const HEADER_LEN: usize = NONCE_LEN + TAG_LEN;

/// A parsed, encrypted column value.
///
/// The byte layout is `nonce(12) || tag(16) || ciphertext`, and the string
/// representation is that byte sequence in standard padded base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlob {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw GCM authentication tag.
    pub tag: [u8; TAG_LEN],
    /// Ciphertext, same length as the plaintext.
    pub ciphertext: Vec<u8>,
}

impl EncodedBlob {
    /// Concatenate the blob into its wire byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split wire bytes into nonce, tag and ciphertext.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedBlob`] if `bytes` is shorter than [`HEADER_LEN`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::MalformedBlob(format!(
                "expected at least {HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let (nonce, rest) = bytes.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let mut blob = Self {
            nonce: [0u8; NONCE_LEN],
            tag: [0u8; TAG_LEN],
            ciphertext: ciphertext.to_vec(),
        };
        blob.nonce.copy_from_slice(nonce);
        blob.tag.copy_from_slice(tag);
        Ok(blob)
    }
}

impl fmt::Display for EncodedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&STANDARD.encode(self.to_bytes()))
    }
}

impl FromStr for EncodedBlob {
    type Err = CodecError;

    /// Parse the base64 storage representation.
    ///
    /// Fails with [`CodecError::MalformedBlob`] before any cipher work is done.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = STANDARD
            .decode(s.trim())
            .map_err(|e| CodecError::MalformedBlob(format!("invalid base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

/// Encrypt a plaintext string under `key` with empty associated data.
///
/// # Errors
///
/// Returns [`CodecError::CipherFailure`] on an internal AEAD error (unreachable
/// for plaintexts below GCM's 64 GiB limit).
pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Result<EncodedBlob, CodecError> {
    encrypt_with_aad(plaintext, key, &[])
}

/// Encrypt a plaintext string, authenticating `aad` alongside it.
///
/// The same `aad` must be presented to [`decrypt_with_aad`].
pub fn encrypt_with_aad(
    plaintext: &str,
    key: &EncryptionKey,
    aad: &[u8],
) -> Result<EncodedBlob, CodecError> {
    let cipher = build_cipher(key);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut ciphertext = plaintext.as_bytes().to_vec();
    let tag = cipher
        .encrypt_in_place_detached(&nonce, aad, &mut ciphertext)
        .map_err(|_| CodecError::CipherFailure)?;

    let mut blob = EncodedBlob {
        nonce: [0u8; NONCE_LEN],
        tag: [0u8; TAG_LEN],
        ciphertext,
    };
    blob.nonce.copy_from_slice(&nonce);
    blob.tag.copy_from_slice(&tag);
    Ok(blob)
}

/// Decrypt an [`EncodedBlob`] back to its plaintext string.
///
/// # Errors
///
/// Returns [`CodecError::AuthenticationFailure`] if the tag does not verify
/// (wrong key, tampered or corrupted data). No plaintext is ever returned in
/// that case.
pub fn decrypt(blob: &EncodedBlob, key: &EncryptionKey) -> Result<String, CodecError> {
    decrypt_with_aad(blob, key, &[])
}

/// Decrypt an [`EncodedBlob`] that was sealed with associated data `aad`.
pub fn decrypt_with_aad(
    blob: &EncodedBlob,
    key: &EncryptionKey,
    aad: &[u8],
) -> Result<String, CodecError> {
    let cipher = build_cipher(key);
    let mut buffer = blob.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&blob.nonce),
            aad,
            &mut buffer,
            Tag::from_slice(&blob.tag),
        )
        .map_err(|_| CodecError::AuthenticationFailure)?;

    String::from_utf8(buffer).map_err(|_| {
        CodecError::deserialization(LogicalType::Text, "decrypted bytes are not valid UTF-8")
    })
}

fn build_cipher(key: &EncryptionKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Cheaply cloneable cipher handle over the process-wide key.
///
/// Works on the base64 storage representation directly. Holds no mutable
/// state, so clones can be used from any number of threads at once.
#[derive(Clone, Debug)]
pub struct FieldCipher {
    key: Arc<EncryptionKey>,
}

impl FieldCipher {
    /// Create a handle sharing `key`.
    pub fn new(key: Arc<EncryptionKey>) -> Self {
        Self { key }
    }

    /// Encrypt `plaintext` and return the base64 blob.
    pub fn seal(&self, plaintext: &str, aad: &[u8]) -> Result<String, CodecError> {
        encrypt_with_aad(plaintext, &self.key, aad).map(|blob| blob.to_string())
    }

    /// Parse and decrypt a base64 blob.
    pub fn open(&self, blob: &str, aad: &[u8]) -> Result<String, CodecError> {
        let blob: EncodedBlob = blob.parse()?;
        decrypt_with_aad(&blob, &self.key, aad)
    }
}
