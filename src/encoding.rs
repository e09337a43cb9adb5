//! Base32 codec for secret transport (RFC 4648).

use base32::Alphabet;

use crate::error::{OtpError, Result};

const ALPHABET: Alphabet = Alphabet::Rfc4648 { padding: false };

/// Encode bytes into the canonical uppercase, unpadded representation.
pub fn encode(bytes: &[u8]) -> String {
    base32::encode(ALPHABET, bytes)
}

/// Decode a base32 string back into bytes.
///
/// Input is normalized first: lower-case letters are accepted, trailing `=`
/// padding is ignored, and spaces or hyphens (authenticator apps display
/// secrets in groups) are stripped. Any remaining character outside the
/// RFC 4648 alphabet fails with [`OtpError::InvalidEncoding`].
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let normalized: String = text
        .trim_end_matches('=')
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if !normalized.bytes().all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b)) {
        return Err(OtpError::InvalidEncoding);
    }

    base32::decode(ALPHABET, &normalized).ok_or(OtpError::InvalidEncoding)
}
