use crate::error::{OrderError, Result};
use chrono::Duration as ChronoDuration;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Longest invoice lifetime the provider accepts (31 days).
pub const MAX_INVOICE_EXPIRY_SECS: u64 = 2_678_400;
pub const MAX_CLAIM_LEASE_SECS: u64 = 86_400;
/// Slack on top of the provider timeout covering the registry round trips
/// around an invoice call.
pub const CLAIM_MARGIN_MS: u64 = 1_000;

/// Runtime settings. Everything the bot used to hard-code (admin role,
/// orders channel, provider mode) is passed in through here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Actors holding the administrator capability.
    pub admins: Vec<u64>,
    /// Channel that receives context notifications; `None` keeps them in the
    /// originating context.
    pub orders_channel: Option<u64>,
    /// Fiat currency invoices are issued in.
    pub currency: String,
    pub invoice_expiry_secs: u64,
    /// Upper bound on any single payment provider call.
    pub provider_timeout_ms: u64,
    /// How long a pricing claim blocks other administrators. Must outlast
    /// `provider_timeout_ms`.
    pub claim_lease_secs: u64,
    pub sandbox_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            admins: Vec::new(),
            orders_channel: None,
            currency: "RUB".to_string(),
            invoice_expiry_secs: 259_200, // 3 days
            provider_timeout_ms: 10_000,
            claim_lease_secs: 60,
            sandbox_base_url: "https://testnet-pay.crypt.bot".to_string(),
        }
    }
}

impl Settings {
    pub fn from_toml(raw: &str) -> Result<Self> {
        let settings: Self = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn invoice_expiry(&self) -> Duration {
        Duration::from_secs(self.invoice_expiry_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Checks the bounds every duration setting has to respect.
    ///
    /// A pricing claim has to outlive the invoice call it guards, otherwise a
    /// second administrator takes over while the first request is in flight.
    pub fn validate(&self) -> Result<()> {
        if self.currency.trim().is_empty() {
            return Err(invalid("currency must not be empty".to_string()));
        }
        if self.provider_timeout_ms == 0 {
            return Err(invalid("provider_timeout_ms must be positive".to_string()));
        }
        if !(1..=MAX_INVOICE_EXPIRY_SECS).contains(&self.invoice_expiry_secs) {
            return Err(invalid(format!(
                "invoice_expiry_secs must be between 1 and {MAX_INVOICE_EXPIRY_SECS}, got {}",
                self.invoice_expiry_secs
            )));
        }
        if self.claim_lease_secs > MAX_CLAIM_LEASE_SECS {
            return Err(invalid(format!(
                "claim_lease_secs must not exceed {MAX_CLAIM_LEASE_SECS}, got {}",
                self.claim_lease_secs
            )));
        }
        if u128::from(self.claim_lease_secs) * 1_000 <= u128::from(self.provider_timeout_ms) {
            return Err(invalid(format!(
                "claim_lease_secs ({}s) must be longer than provider_timeout_ms ({}ms)",
                self.claim_lease_secs, self.provider_timeout_ms
            )));
        }
        Ok(())
    }

    /// Effective pricing claim lease: the configured lease, raised to the
    /// provider timeout plus [`CLAIM_MARGIN_MS`] when shorter.
    pub fn claim_lease(&self) -> Result<ChronoDuration> {
        let configured = i64::try_from(self.claim_lease_secs)
            .ok()
            .and_then(ChronoDuration::try_seconds)
            .ok_or_else(|| {
                invalid(format!(
                    "claim_lease_secs out of range: {}",
                    self.claim_lease_secs
                ))
            })?;
        let floor = self
            .provider_timeout_ms
            .checked_add(CLAIM_MARGIN_MS)
            .and_then(|ms| i64::try_from(ms).ok())
            .and_then(ChronoDuration::try_milliseconds)
            .ok_or_else(|| {
                invalid(format!(
                    "provider_timeout_ms out of range: {}",
                    self.provider_timeout_ms
                ))
            })?;
        Ok(configured.max(floor))
    }
}

fn invalid(message: String) -> OrderError {
    OrderError::InvalidSettings(message)
}
