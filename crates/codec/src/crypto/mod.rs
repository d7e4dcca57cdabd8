//! AES-256-GCM column encryption primitives.
//!
//! This module is free of serialization and storage concerns. It turns an
//! opaque UTF-8 string into a self-contained blob and back.
//!
//! # Blob format
//!
//! ```text
//! base64( nonce[0..12] || tag[12..28] || ciphertext[28..] )
//! ```
//!
//! The key is always the SHA-256 digest of the operator secret.

pub mod cipher;
pub mod key;

pub use cipher::{
    decrypt, decrypt_with_aad, encrypt, encrypt_with_aad, EncodedBlob, FieldCipher, HEADER_LEN,
    NONCE_LEN, TAG_LEN,
};
pub use key::{EncryptionKey, KEY_LEN};
