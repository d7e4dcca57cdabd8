//! Configuration loading and validation.
//!
//! All values are read from environment variables at startup. A missing or
//! empty `ENCRYPTION_KEY` is fatal: the process must not start without a key.

use std::sync::Arc;

use anyhow::{Context, Result};
use common::CodecError;
use serde::Deserialize;

use crate::crypto::{EncryptionKey, FieldCipher};

/// Validated codec configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Operator secret the AES key is derived from. **Required.**
    #[serde(default)]
    pub encryption_key: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Authenticate column names as AEAD associated data.
    #[serde(default)]
    pub bind_column_identity: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("encryption_key", &"[REDACTED]")
            .field("log_level", &self.log_level)
            .field("bind_column_identity", &self.bind_column_identity)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot be read or
    /// `ENCRYPTION_KEY` is absent or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_environment(config::Environment::default())
    }

    /// Values stay strings until serde sees them, so a numeric-looking
    /// secret such as `007` is used verbatim.
    fn from_environment(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Derive the process-wide key from the configured secret.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MissingKeyConfiguration`] if the secret is empty.
    pub fn encryption_key(&self) -> Result<Arc<EncryptionKey>> {
        let key = EncryptionKey::derive(&self.encryption_key)
            .context("ENCRYPTION_KEY environment variable is required")?;
        Ok(Arc::new(key))
    }

    /// A [`FieldCipher`] over the derived key.
    pub fn field_cipher(&self) -> Result<FieldCipher> {
        Ok(FieldCipher::new(self.encryption_key()?))
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.encryption_key.trim().is_empty() {
            return Err(CodecError::MissingKeyConfiguration(
                "ENCRYPTION_KEY environment variable is required".into(),
            )
            .into());
        }
        ensure_non_empty(&self.log_level, "LOG_LEVEL")?;
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
