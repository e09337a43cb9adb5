//! Otpvault issues and verifies time-based one-time codes and protects the
//! shared secrets behind them while stored.
//!
//! The crate is the computing core of an authenticator service: the TOTP
//! engine, the secret vault and the refresh scheduler. Routing, storage and
//! presentation are external collaborators; everything here is a pure
//! function of its inputs plus the one-time vault key load.

#![forbid(unsafe_code)]
#![deny(unused_mut)]

pub mod config;
pub mod encoding;
pub mod error;
pub mod hotp;
pub mod provision;
pub mod scheduler;
pub mod telemetry;
pub mod totp;
pub mod vault;

use std::sync::Arc;

pub use error::{OtpError, Result};
pub use hotp::Algorithm;
pub use provision::{Provisioned, Secret};
pub use scheduler::{AccountCodeState, RefreshScheduler};
pub use totp::TotpConfig;
pub use vault::{EncryptedBlob, Vault, VaultKey};

/// State sharing between the core and its collaborators.
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub vault: Vault,
}

/// Initialize the application state.
///
/// Reads `config.yaml` (falling back to defaults) and loads the vault key
/// from the `KEY` environment variable. A missing or malformed key is an
/// error the process must not survive: continuing with an ephemeral key
/// would invalidate every previously stored secret on restart.
pub fn initialize_state() -> Result<AppState> {
    let config = config::Configuration::default().read();
    let key = VaultKey::from_env(vault::KEY_ENV)?;

    Ok(AppState {
        config,
        vault: Vault::new(key),
    })
}
