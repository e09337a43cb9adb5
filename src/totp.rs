//! TOTP engine (RFC 6238) layered on the HOTP primitive.
//!
//! Every function is a pure computation over its inputs and an explicit
//! `time` in unix seconds, so verification and generation stay deterministic
//! and testable; [`unix_now`] is the only wall-clock accessor.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use subtle::{Choice, ConstantTimeEq};

use crate::error::{OtpError, Result};
use crate::hotp::{self, Algorithm};

const MIN_DIGITS: u32 = 6;
const MAX_DIGITS: u32 = 8;
const MIN_PERIOD: u64 = 15;
const MAX_PERIOD: u64 = 300;

/// Default verification tolerance, in periods either side of `time`.
pub const DEFAULT_WINDOW: u8 = 1;

/// Hard cap on the verification window. Every accepted step widens the
/// replay surface, so the tolerance stays small and explicit.
pub const MAX_WINDOW: u8 = 4;

/// Per-credential code policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotpConfig {
    /// Number of digits for the code.
    pub digits: u32,
    /// Validity window of a single code, in seconds.
    pub period: u64,
    /// Keyed-hash variant.
    pub algorithm: Algorithm,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            digits: 6,
            period: 30,
            algorithm: Algorithm::Sha1,
        }
    }
}

impl TotpConfig {
    /// Reject out-of-contract values. Nothing is clamped: a config outside
    /// the contract must never silently produce codes.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_DIGITS..=MAX_DIGITS).contains(&self.digits) {
            return Err(OtpError::InvalidDigits(self.digits));
        }
        if !(MIN_PERIOD..=MAX_PERIOD).contains(&self.period) {
            return Err(OtpError::InvalidPeriod(self.period));
        }
        Ok(())
    }
}

/// Map a unix timestamp onto its counting period.
pub fn counter_for(time: u64, period: u64) -> u64 {
    time / period
}

/// Seconds before the code derived at `time` rolls over.
///
/// Always in `[1, period]`: at an exact boundary the just-started counter
/// owns a full fresh period.
pub fn seconds_remaining(time: u64, period: u64) -> u64 {
    period - time % period
}

/// Current unix timestamp, in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Compute the code valid at `time`.
pub fn code_at(secret: &[u8], config: &TotpConfig, time: u64) -> Result<String> {
    config.validate()?;
    hotp::compute(
        secret,
        counter_for(time, config.period),
        config.digits,
        config.algorithm,
    )
}

/// Compute the code valid right now.
pub fn current_code(secret: &[u8], config: &TotpConfig) -> Result<String> {
    code_at(secret, config, unix_now())
}

/// Check a candidate code against every counter in `[-window, +window]`
/// periods around `time`.
///
/// Comparisons run in constant time over the full code length and every
/// counter in the window is always evaluated, so no timing signal reveals
/// which step matched. Verification mutates nothing; a code replayed inside
/// the window is accepted, which is the documented trade-off of TOTP.
pub fn verify_at(
    candidate: &str,
    secret: &[u8],
    config: &TotpConfig,
    time: u64,
    window: u8,
) -> Result<bool> {
    config.validate()?;
    if window > MAX_WINDOW {
        return Err(OtpError::InvalidWindow {
            got: window,
            max: MAX_WINDOW,
        });
    }

    // Users paste codes with the grouping their authenticator displays.
    let normalized: String = candidate
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    if normalized.len() != config.digits as usize {
        return Ok(false);
    }

    let current = counter_for(time, config.period);
    let mut matched = Choice::from(0u8);
    for step in -i64::from(window)..=i64::from(window) {
        let Some(counter) = current.checked_add_signed(step) else {
            continue;
        };
        let expected = hotp::compute(secret, counter, config.digits, config.algorithm)?;
        matched |= normalized.as_bytes().ct_eq(expected.as_bytes());
    }

    Ok(matched.into())
}

/// Check a candidate code against the current time with the default window.
pub fn verify(candidate: &str, secret: &[u8], config: &TotpConfig) -> Result<bool> {
    verify_at(candidate, secret, config, unix_now(), DEFAULT_WINDOW)
}

/// Compute a throwaway code to prove a secret/config pair is usable before
/// it is accepted for storage.
pub fn probe(secret: &[u8], config: &TotpConfig) -> Result<()> {
    code_at(secret, config, unix_now()).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding;

    const SECRET: &[u8] = b"12345678901234567890";

    fn config(digits: u32, period: u64, algorithm: Algorithm) -> TotpConfig {
        TotpConfig {
            digits,
            period,
            algorithm,
        }
    }

    #[test]
    fn test_rfc6238_vectors_sha1() {
        let config = config(8, 30, Algorithm::Sha1);

        assert_eq!(code_at(SECRET, &config, 59).unwrap(), "94287082");
        assert_eq!(code_at(SECRET, &config, 1111111109).unwrap(), "07081804");
        assert_eq!(code_at(SECRET, &config, 1234567890).unwrap(), "89005924");
        assert_eq!(code_at(SECRET, &config, 2000000000).unwrap(), "69279037");
    }

    #[test]
    fn test_shared_secret_vector() {
        // The canonical demo secret maps the first two periods onto the
        // first two counters.
        let secret = encoding::decode("JBSWY3DPEHPK3PXP").unwrap();
        let config = TotpConfig::default();

        assert_eq!(
            code_at(&secret, &config, 0).unwrap(),
            hotp::compute(&secret, 0, 6, Algorithm::Sha1).unwrap()
        );
        assert_eq!(
            code_at(&secret, &config, 30).unwrap(),
            hotp::compute(&secret, 1, 6, Algorithm::Sha1).unwrap()
        );
    }

    #[test]
    fn test_counter_for() {
        assert_eq!(counter_for(0, 30), 0);
        assert_eq!(counter_for(29, 30), 0);
        assert_eq!(counter_for(30, 30), 1);
        assert_eq!(counter_for(59, 30), 1);
        assert_eq!(counter_for(60, 60), 1);
    }

    #[test]
    fn test_seconds_remaining_bounds() {
        for time in 0..600 {
            let remaining = seconds_remaining(time, 30);
            assert!((1..=30).contains(&remaining), "time {time}");
        }
    }

    #[test]
    fn test_seconds_remaining_counts_down_and_resets() {
        assert_eq!(seconds_remaining(0, 30), 30);
        assert_eq!(seconds_remaining(1, 30), 29);
        assert_eq!(seconds_remaining(29, 30), 1);
        assert_eq!(seconds_remaining(30, 30), 30);
    }

    #[test]
    fn test_verify_accepts_current_code() {
        let config = TotpConfig::default();
        for time in [0, 59, 1111111109, 2000000000] {
            let code = code_at(SECRET, &config, time).unwrap();
            assert!(verify_at(&code, SECRET, &config, time, 1).unwrap());
        }
    }

    #[test]
    fn test_verify_window_tolerance() {
        let config = TotpConfig::default();
        let time = 1111111109;

        let previous = code_at(SECRET, &config, time - 30).unwrap();
        let next = code_at(SECRET, &config, time + 30).unwrap();
        let stale = code_at(SECRET, &config, time - 60).unwrap();

        assert!(verify_at(&previous, SECRET, &config, time, 1).unwrap());
        assert!(verify_at(&next, SECRET, &config, time, 1).unwrap());
        assert!(!verify_at(&stale, SECRET, &config, time, 1).unwrap());
        // The same stale code passes once the window covers it.
        assert!(verify_at(&stale, SECRET, &config, time, 2).unwrap());
    }

    #[test]
    fn test_verify_zero_window() {
        let config = TotpConfig::default();
        let time = 600;
        let previous = code_at(SECRET, &config, time - 30).unwrap();

        assert!(!verify_at(&previous, SECRET, &config, time, 0).unwrap());
    }

    #[test]
    fn test_verify_rejects_oversized_window() {
        let config = TotpConfig::default();
        assert!(matches!(
            verify_at("000000", SECRET, &config, 0, MAX_WINDOW + 1),
            Err(OtpError::InvalidWindow { got: 5, max: 4 })
        ));
    }

    #[test]
    fn test_verify_grouped_input() {
        let config = TotpConfig::default();
        let time = 90;
        let code = code_at(SECRET, &config, time).unwrap();
        let grouped = format!("{} {}", &code[..3], &code[3..]);

        assert!(verify_at(&grouped, SECRET, &config, time, 1).unwrap());
    }

    #[test]
    fn test_verify_wrong_length_is_false_not_error() {
        let config = TotpConfig::default();
        assert!(!verify_at("12345", SECRET, &config, 0, 1).unwrap());
        assert!(!verify_at("1234567", SECRET, &config, 0, 1).unwrap());
    }

    #[test]
    fn test_config_validation() {
        assert!(TotpConfig::default().validate().is_ok());
        assert!(config(7, 15, Algorithm::Sha256).validate().is_ok());
        assert!(config(8, 300, Algorithm::Sha512).validate().is_ok());

        assert!(matches!(
            config(5, 30, Algorithm::Sha1).validate(),
            Err(OtpError::InvalidDigits(5))
        ));
        assert!(matches!(
            config(6, 14, Algorithm::Sha1).validate(),
            Err(OtpError::InvalidPeriod(14))
        ));
        assert!(matches!(
            config(6, 301, Algorithm::Sha1).validate(),
            Err(OtpError::InvalidPeriod(301))
        ));
    }

    #[test]
    fn test_code_rejects_invalid_config() {
        assert!(code_at(SECRET, &config(9, 30, Algorithm::Sha1), 0).is_err());
        assert!(code_at(SECRET, &config(6, 10, Algorithm::Sha1), 0).is_err());
    }

    #[test]
    fn test_probe() {
        assert!(probe(SECRET, &TotpConfig::default()).is_ok());
        assert!(probe(b"", &TotpConfig::default()).is_err());
    }
}
