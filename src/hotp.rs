//! HOTP primitive (RFC 4226).

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::error::{OtpError, Result};

/// Keyed-hash variants accepted for code derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    #[serde(alias = "SHA1")]
    Sha1,
    #[serde(alias = "SHA256")]
    Sha256,
    #[serde(alias = "SHA512")]
    Sha512,
}

impl Algorithm {
    /// Canonical name used in provisioning URIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha256 => "SHA256",
            Algorithm::Sha512 => "SHA512",
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = OtpError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().as_str() {
            "SHA1" => Ok(Algorithm::Sha1),
            "SHA256" => Ok(Algorithm::Sha256),
            "SHA512" => Ok(Algorithm::Sha512),
            _ => Err(OtpError::UnsupportedAlgorithm(value.to_owned())),
        }
    }
}

/// Computes a single counter-based code.
///
/// The counter is serialized big-endian on 8 bytes and signed with HMAC;
/// dynamic truncation (RFC 4226 §5.3) extracts a 31-bit word which is
/// reduced modulo `10^digits` and zero-padded. The structure of the
/// computation does not depend on the secret content.
pub fn compute(secret: &[u8], counter: u64, digits: u32, algorithm: Algorithm) -> Result<String> {
    if secret.is_empty() {
        return Err(OtpError::EmptySecret);
    }
    if !(6..=8).contains(&digits) {
        return Err(OtpError::InvalidDigits(digits));
    }

    let counter_bytes = counter.to_be_bytes();
    let digest = match algorithm {
        Algorithm::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(secret)
                .map_err(|_| OtpError::EmptySecret)?;
            mac.update(&counter_bytes);
            mac.finalize().into_bytes().to_vec()
        },
        Algorithm::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret)
                .map_err(|_| OtpError::EmptySecret)?;
            mac.update(&counter_bytes);
            mac.finalize().into_bytes().to_vec()
        },
        Algorithm::Sha512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(secret)
                .map_err(|_| OtpError::EmptySecret)?;
            mac.update(&counter_bytes);
            mac.finalize().into_bytes().to_vec()
        },
    };

    // Dynamic truncation.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(digest[offset] & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    let code = binary % 10u32.pow(digits);
    Ok(format!("{code:0width$}", width = digits as usize))
}
