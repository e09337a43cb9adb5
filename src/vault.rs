//! Secret-at-rest encryption with AES-256-GCM.
//!
//! The vault owns the process-wide key for its whole lifetime: loaded once
//! at startup, read-only afterwards, so encrypt/decrypt calls are safe to
//! run concurrently without synchronization.

use std::fmt;
use std::str::FromStr;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{OtpError, Result};
use crate::provision::Secret;

const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const KEY_LENGTH: usize = 32;

/// Environment variable holding the hex-encoded vault key.
pub const KEY_ENV: &str = "KEY";

/// VaultKey holds the fixed-size key protected by Zeroizing.
#[derive(Clone)]
pub struct VaultKey(Zeroizing<[u8; KEY_LENGTH]>);

impl VaultKey {
    /// Parse a 64-character hex key.
    pub fn from_hex(value: &str) -> Result<Self> {
        let bytes = hex::decode(value.trim()).map_err(|_| OtpError::InvalidKey)?;
        let key: [u8; KEY_LENGTH] = bytes.try_into().map_err(|_| OtpError::InvalidKey)?;
        Ok(Self(Zeroizing::new(key)))
    }

    /// Load the key from the environment, once, at startup.
    ///
    /// A missing key fails startup. Substituting an ephemeral key instead
    /// would silently invalidate every previously stored secret on restart.
    pub fn from_env(var: &'static str) -> Result<Self> {
        match std::env::var(var) {
            Ok(value) => Self::from_hex(&value),
            Err(_) => Err(OtpError::MissingKey(var)),
        }
    }

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/// Generate a fresh random key in the hex form [`VaultKey::from_hex`]
/// expects, for operators provisioning a deployment.
pub fn generate_key() -> Result<String> {
    let mut key = [0u8; KEY_LENGTH];
    OsRng
        .try_fill_bytes(&mut key)
        .map_err(|_| OtpError::GenerationFailure)?;
    Ok(hex::encode(key))
}

/// One encryption result: initialization vector, authentication tag and
/// ciphertext, each independently addressable. All three are required for
/// decryption and must be persisted together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    pub iv: [u8; NONCE_SIZE],
    pub tag: [u8; TAG_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Stored form: three colon-delimited lowercase hex fields.
impl fmt::Display for EncryptedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            hex::encode(self.iv),
            hex::encode(self.tag),
            hex::encode(&self.ciphertext)
        )
    }
}

impl FromStr for EncryptedBlob {
    type Err = OtpError;

    fn from_str(value: &str) -> Result<Self> {
        let mut parts = value.split(':');
        let (Some(iv), Some(tag), Some(ciphertext), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(OtpError::MalformedBlob("expected three colon-delimited fields"));
        };
        if iv.is_empty() || tag.is_empty() || ciphertext.is_empty() {
            return Err(OtpError::MalformedBlob("empty field"));
        }

        let iv = hex::decode(iv).map_err(|_| OtpError::MalformedBlob("iv is not hex"))?;
        let iv: [u8; NONCE_SIZE] = iv
            .try_into()
            .map_err(|_| OtpError::MalformedBlob("iv must be 12 bytes"))?;

        let tag = hex::decode(tag).map_err(|_| OtpError::MalformedBlob("tag is not hex"))?;
        let tag: [u8; TAG_SIZE] = tag
            .try_into()
            .map_err(|_| OtpError::MalformedBlob("tag must be 16 bytes"))?;

        let ciphertext = hex::decode(ciphertext)
            .map_err(|_| OtpError::MalformedBlob("ciphertext is not hex"))?;

        Ok(Self {
            iv,
            tag,
            ciphertext,
        })
    }
}

/// Vault provides encrypt/decrypt operations over stored secrets.
pub struct Vault {
    key: VaultKey,
}

impl Vault {
    /// Create a new [`Vault`].
    pub fn new(key: VaultKey) -> Self {
        Self { key }
    }

    /// Encrypt a secret for storage.
    ///
    /// Draws a fresh random 96-bit iv on every call: two encryptions of the
    /// same secret never produce the same blob.
    pub fn encrypt(&self, secret: &Secret) -> Result<EncryptedBlob> {
        let key = Key::<Aes256Gcm>::from_slice(self.key.as_slice());
        let cipher = Aes256Gcm::new(key);

        let mut iv = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|_| OtpError::GenerationFailure)?;

        let mut sealed = cipher
            .encrypt(Nonce::from_slice(&iv), secret.as_bytes())
            .map_err(|_| OtpError::SealFailure)?;

        // The aead API appends the tag; split it out so the three parts
        // stay independently addressable in storage.
        let tag_bytes = sealed.split_off(sealed.len() - TAG_SIZE);
        let tag: [u8; TAG_SIZE] = tag_bytes
            .try_into()
            .map_err(|_| OtpError::SealFailure)?;

        Ok(EncryptedBlob {
            iv,
            tag,
            ciphertext: sealed,
        })
    }

    /// Decrypt a stored blob back into the plain secret.
    ///
    /// A tag that does not verify, whether from a tampered blob or a wrong
    /// key, is [`OtpError::AuthenticationFailure`]; the cipher never
    /// returns a wrong plaintext.
    pub fn decrypt(&self, blob: &EncryptedBlob) -> Result<Secret> {
        let key = Key::<Aes256Gcm>::from_slice(self.key.as_slice());
        let cipher = Aes256Gcm::new(key);

        let mut sealed = Vec::with_capacity(blob.ciphertext.len() + TAG_SIZE);
        sealed.extend_from_slice(&blob.ciphertext);
        sealed.extend_from_slice(&blob.tag);

        let plain = cipher
            .decrypt(Nonce::from_slice(&blob.iv), sealed.as_slice())
            .map_err(|_| OtpError::AuthenticationFailure)?;

        Secret::from_bytes(plain)
    }
}
