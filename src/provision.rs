//! Secret provisioning: fresh random secrets and `otpauth://` URIs.
//!
//! The QR image handed to the user is rendered by an external collaborator;
//! this module only supplies the URI text it encodes.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::encoding;
use crate::error::{OtpError, Result};
use crate::totp::TotpConfig;

/// Generated secret length in bytes (160 bits).
pub const SECRET_LENGTH: usize = 20;

/// Shared secret bytes, zeroized on drop.
///
/// A secret is immutable once issued: rotating a credential means
/// generating a new one, never mutating this value.
#[derive(Clone)]
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    /// Draw a fresh secret from the OS CSPRNG.
    ///
    /// An unavailable random source is [`OtpError::GenerationFailure`] and
    /// must be treated as fatal by the caller; there is no fallback to a
    /// weaker source.
    pub fn generate() -> Result<Self> {
        let mut bytes = Zeroizing::new(vec![0u8; SECRET_LENGTH]);
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| OtpError::GenerationFailure)?;
        Ok(Self(bytes))
    }

    /// Wrap raw bytes, for the decryption path.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(OtpError::EmptySecret);
        }
        Ok(Self(Zeroizing::new(bytes)))
    }

    /// Parse the canonical base32 transport representation.
    pub fn from_base32(text: &str) -> Result<Self> {
        Self::from_bytes(encoding::decode(text)?)
    }

    /// Canonical base32 transport representation.
    pub fn to_base32(&self) -> String {
        encoding::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never leak secret material through logs.
        f.debug_struct("Secret").finish_non_exhaustive()
    }
}

/// A freshly provisioned credential.
pub struct Provisioned {
    pub secret: Secret,
    /// `otpauth://` URI consumed by authenticator apps.
    pub uri: String,
}

/// Generate a new credential for `label` under `issuer`.
pub fn generate(label: &str, issuer: &str, config: &TotpConfig) -> Result<Provisioned> {
    config.validate()?;
    let secret = Secret::generate()?;
    let uri = provisioning_uri(&secret, label, issuer, config);
    Ok(Provisioned { secret, uri })
}

/// Format the canonical provisioning URI.
///
/// All five parameters are always present; authenticator apps fall back to
/// the universal defaults (SHA1, 6 digits, 30 seconds) when one is missing,
/// and emitting them unconditionally avoids that ambiguity.
pub fn provisioning_uri(secret: &Secret, label: &str, issuer: &str, config: &TotpConfig) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm={}&digits={}&period={}",
        urlencoding::encode(issuer),
        urlencoding::encode(label),
        secret.to_base32(),
        urlencoding::encode(issuer),
        config.algorithm.as_str(),
        config.digits,
        config.period,
    )
}
