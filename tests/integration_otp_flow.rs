//! End-to-end flow: provision a credential, store it through the vault,
//! read it back and serve verified codes on the scheduler's cadence.

use otpvault::{
    Algorithm, OtpError, RefreshScheduler, Secret, TotpConfig, Vault, VaultKey, provision, totp,
    vault,
};

fn test_vault() -> Vault {
    let key = VaultKey::from_hex(&vault::generate_key().unwrap()).unwrap();
    Vault::new(key)
}

#[test]
fn provision_store_and_serve_codes() {
    let config = TotpConfig {
        digits: 6,
        period: 30,
        algorithm: Algorithm::Sha1,
    };

    // Provision a fresh credential.
    let provisioned = provision::generate("user@example.com", "Example", &config).unwrap();
    assert!(provisioned.uri.starts_with("otpauth://totp/"));

    // Encrypt for storage, then simulate a store round-trip through the
    // colon-delimited text form.
    let vault = test_vault();
    let stored = vault.encrypt(&provisioned.secret).unwrap().to_string();
    let secret = vault.decrypt(&stored.parse().unwrap()).unwrap();
    assert_eq!(secret.as_bytes(), provisioned.secret.as_bytes());

    // The decrypted secret serves codes that verify at the same instant.
    let now = 1_700_000_000;
    let code = totp::code_at(secret.as_bytes(), &config, now).unwrap();
    assert!(totp::verify_at(&code, secret.as_bytes(), &config, now, 1).unwrap());

    // And the scheduler refreshes it on its own boundary.
    let boundary = (totp::counter_for(now, config.period) + 1) * config.period;
    let expected = totp::code_at(secret.as_bytes(), &config, boundary).unwrap();

    let mut scheduler = RefreshScheduler::new();
    let state = scheduler.track("acct", secret, config, now).unwrap();
    assert_eq!(state.code, code);

    assert!(scheduler.tick(boundary - 1).is_empty());
    let refreshed = scheduler.tick(boundary);
    assert_eq!(refreshed.len(), 1);
    assert_eq!(refreshed[0].code, expected);
}

#[test]
fn tampered_storage_never_reaches_the_engine() {
    let vault = test_vault();
    let secret = Secret::from_base32("JBSWY3DPEHPK3PXP").unwrap();

    let mut blob = vault.encrypt(&secret).unwrap();
    blob.ciphertext[0] ^= 0xff;

    assert!(matches!(
        vault.decrypt(&blob),
        Err(OtpError::AuthenticationFailure)
    ));
}

#[test]
fn imported_secret_is_probed_before_acceptance() {
    let config = TotpConfig::default();

    let secret = Secret::from_base32("JBSWY3DPEHPK3PXP").unwrap();
    assert!(totp::probe(secret.as_bytes(), &config).is_ok());

    assert!(matches!(
        Secret::from_base32("not base32!"),
        Err(OtpError::InvalidEncoding)
    ));
}
