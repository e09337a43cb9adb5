//! Per-account code refresh scheduling.
//!
//! Accounts configure their own period, so a single shared countdown would
//! show stale or premature codes for anything but the 30-second default.
//! The scheduler instead keeps one due-time per tracked account and only
//! recomputes the accounts whose boundary has passed. Each tracked account
//! cycles awaiting-boundary -> refreshed -> awaiting-boundary for as long
//! as it stays tracked.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

use crate::error::Result;
use crate::provision::Secret;
use crate::totp::{self, TotpConfig};

/// Displayed state of one tracked account. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCodeState {
    pub account_id: String,
    pub code: String,
    pub seconds_remaining: u64,
}

struct TrackedAccount {
    secret: Secret,
    config: TotpConfig,
    /// Unix second of the next counter boundary.
    next_due: u64,
}

/// Drives periodic recomputation of displayed codes.
///
/// All mutation goes through `&mut self`: one logical writer per tick
/// cycle. Timer-driven use wraps the scheduler in [`spawn_refresh_loop`],
/// which owns it inside a single task so ticks can never overlap.
#[derive(Default)]
pub struct RefreshScheduler {
    accounts: HashMap<String, TrackedAccount>,
}

impl RefreshScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an account and return its initial state.
    ///
    /// Re-tracking an already known account replaces its secret and config.
    pub fn track(
        &mut self,
        account_id: impl Into<String>,
        secret: Secret,
        config: TotpConfig,
        now: u64,
    ) -> Result<AccountCodeState> {
        config.validate()?;
        let account_id = account_id.into();

        let code = totp::code_at(secret.as_bytes(), &config, now)?;
        let state = AccountCodeState {
            account_id: account_id.clone(),
            code,
            seconds_remaining: totp::seconds_remaining(now, config.period),
        };

        let next_due = (totp::counter_for(now, config.period) + 1) * config.period;
        self.accounts.insert(
            account_id,
            TrackedAccount {
                secret,
                config,
                next_due,
            },
        );

        Ok(state)
    }

    /// Stop tracking an account. Returns whether it was known.
    pub fn untrack(&mut self, account_id: &str) -> bool {
        self.accounts.remove(account_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Recompute every account whose boundary has passed.
    ///
    /// Accounts away from their boundary are untouched. A failing account
    /// is skipped and logged; it must never take the other accounts' codes
    /// down with it.
    pub fn tick(&mut self, now: u64) -> Vec<AccountCodeState> {
        let mut refreshed = Vec::new();

        for (account_id, account) in &mut self.accounts {
            if now < account.next_due {
                continue;
            }

            match totp::code_at(account.secret.as_bytes(), &account.config, now) {
                Ok(code) => {
                    account.next_due =
                        (totp::counter_for(now, account.config.period) + 1) * account.config.period;
                    refreshed.push(AccountCodeState {
                        account_id: account_id.clone(),
                        code,
                        seconds_remaining: totp::seconds_remaining(now, account.config.period),
                    });
                },
                Err(err) => {
                    tracing::warn!(account = %account_id, error = %err, "skipping code refresh");
                },
            }
        }

        refreshed
    }

    /// Seconds until the account's next refresh is due, for countdown
    /// display. Zero means a refresh is pending on the next tick. `None`
    /// for untracked accounts.
    pub fn seconds_until_next(&self, account_id: &str, now: u64) -> Option<u64> {
        self.accounts
            .get(account_id)
            .map(|account| account.next_due.saturating_sub(now))
    }
}

/// Tick the scheduler once per second, publishing refreshed states on
/// `updates`. The loop owns the scheduler, which serializes every mutation
/// on one task; it stops once the receiving side is dropped.
pub fn spawn_refresh_loop(
    mut scheduler: RefreshScheduler,
    updates: mpsc::Sender<Vec<AccountCodeState>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if updates.is_closed() {
                break;
            }

            let refreshed = scheduler.tick(totp::unix_now());
            if !refreshed.is_empty() && updates.send(refreshed).await.is_err() {
                break;
            }

            sleep(Duration::from_secs(1)).await;
        }
    })
}
