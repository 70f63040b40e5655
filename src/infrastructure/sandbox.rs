use crate::domain::invoice::{InvoiceHandle, InvoiceRequest};
use crate::domain::order::Price;
use crate::domain::ports::PaymentProvider;
use crate::error::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
struct SandboxInvoice {
    handle: InvoiceHandle,
    amount: Price,
    currency: String,
    expires_at: DateTime<Utc>,
    paid: bool,
}

#[derive(Debug, Default)]
struct SandboxState {
    invoices: HashMap<String, SandboxInvoice>,
    next_id: u64,
    outage: Option<ProviderError>,
    latency: Duration,
}

/// An in-process stand-in for a test-net invoicing service.
///
/// Invoices are keyed by the caller's reference and a reference is invoiced
/// at most once. Payment happens out of band
/// through [`SandboxPaymentProvider::mark_paid`], the way a real payer settles
/// an invoice in the provider's own UI. Outages and latency can be injected to
/// exercise the engine's retry paths.
///
/// `Clone` shares the underlying state.
#[derive(Clone)]
pub struct SandboxPaymentProvider {
    base_url: String,
    state: Arc<RwLock<SandboxState>>,
    created: Arc<AtomicUsize>,
}

impl Default for SandboxPaymentProvider {
    fn default() -> Self {
        Self::new("https://testnet-pay.crypt.bot")
    }
}

impl SandboxPaymentProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Arc::default(),
            created: Arc::default(),
        }
    }

    /// Settles the invoice for `reference`. Returns `false` when there is no
    /// such invoice or it has expired.
    pub fn mark_paid(&self, reference: &str) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        match state.invoices.get_mut(reference) {
            Some(invoice) if Utc::now() < invoice.expires_at => {
                invoice.paid = true;
                debug!(reference, amount = %invoice.amount, currency = %invoice.currency, "sandbox invoice paid");
                true
            }
            _ => false,
        }
    }

    /// Makes every subsequent call fail with `outage` until cleared with `None`.
    pub fn set_outage(&self, outage: Option<ProviderError>) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).outage = outage;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).latency = latency;
    }

    /// Number of successful `create_invoice` calls so far.
    pub fn invoices_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn invoice(&self, reference: &str) -> Option<InvoiceHandle> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.invoices.get(reference).map(|i| i.handle.clone())
    }

    /// Latency and outage are read up front so no lock is held while sleeping.
    fn conditions(&self) -> (Duration, Option<ProviderError>) {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        (state.latency, state.outage.clone())
    }

    async fn simulate_network(&self) -> Result<(), ProviderError> {
        let (latency, outage) = self.conditions();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match outage {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentProvider for SandboxPaymentProvider {
    async fn create_invoice(&self, request: InvoiceRequest) -> Result<InvoiceHandle, ProviderError> {
        self.simulate_network().await?;
        if request.reference.is_empty() {
            return Err(ProviderError::Rejected("empty payload".to_string()));
        }
        let expires_in = chrono::Duration::from_std(request.expires_in)
            .map_err(|e| ProviderError::Rejected(format!("invalid expiry: {e}")))?;

        let expires_at = Utc::now()
            .checked_add_signed(expires_in)
            .ok_or_else(|| ProviderError::Rejected("expiry out of range".to_string()))?;

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.invoices.contains_key(&request.reference) {
            return Err(ProviderError::Rejected(format!(
                "duplicate payload {}",
                request.reference
            )));
        }
        state.next_id += 1;
        let invoice_id = state.next_id.to_string();
        let handle = InvoiceHandle {
            payment_url: format!("{}/invoices/{}", self.base_url, invoice_id),
            invoice_id,
        };
        state.invoices.insert(
            request.reference.clone(),
            SandboxInvoice {
                handle: handle.clone(),
                amount: request.amount,
                currency: request.currency,
                expires_at,
                paid: false,
            },
        );
        self.created.fetch_add(1, Ordering::SeqCst);
        debug!(reference = %request.reference, invoice = %handle.invoice_id, description = %request.description, "sandbox invoice created");
        Ok(handle)
    }

    async fn is_paid(&self, reference: &str) -> Result<bool, ProviderError> {
        self.simulate_network().await?;
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .invoices
            .get(reference)
            .is_some_and(|invoice| invoice.paid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(reference: &str, expires_in: Duration) -> InvoiceRequest {
        InvoiceRequest {
            amount: Price::new(dec!(1500)).unwrap(),
            reference: reference.to_string(),
            currency: "RUB".to_string(),
            expires_in,
            description: format!("Order #{reference}"),
        }
    }

    #[tokio::test]
    async fn test_invoice_lifecycle() {
        let provider = SandboxPaymentProvider::new("https://pay.example/");
        let handle = provider
            .create_invoice(request("42", Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(handle.payment_url, "https://pay.example/invoices/1");
        assert_eq!(provider.invoice("42"), Some(handle));
        assert!(!provider.is_paid("42").await.unwrap());

        assert!(provider.mark_paid("42"));
        assert!(provider.is_paid("42").await.unwrap());
        assert!(!provider.is_paid("unknown").await.unwrap());
        assert_eq!(provider.invoices_created(), 1);
    }

    #[tokio::test]
    async fn test_expired_invoice_cannot_be_paid() {
        let provider = SandboxPaymentProvider::default();
        provider
            .create_invoice(request("old", Duration::ZERO))
            .await
            .unwrap();
        assert!(!provider.mark_paid("old"));
        assert!(!provider.mark_paid("missing"));
        assert!(!provider.is_paid("old").await.unwrap());
    }

    #[tokio::test]
    async fn test_second_invoice_for_reference_is_rejected() {
        let provider = SandboxPaymentProvider::default();
        let first = provider
            .create_invoice(request("7", Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(matches!(
            provider.create_invoice(request("7", Duration::from_secs(60))).await,
            Err(ProviderError::Rejected(_))
        ));
        assert_eq!(provider.invoice("7"), Some(first));
        assert_eq!(provider.invoices_created(), 1);
    }

    #[tokio::test]
    async fn test_unrepresentable_expiry_is_rejected() {
        let provider = SandboxPaymentProvider::default();
        let result = provider
            .create_invoice(request("far", Duration::from_secs(i64::MAX as u64 / 1_000)))
            .await;
        assert!(matches!(result, Err(ProviderError::Rejected(_))));
        assert_eq!(provider.invoices_created(), 0);
    }

    #[tokio::test]
    async fn test_outage_is_reported() {
        let provider = SandboxPaymentProvider::default();
        provider.set_outage(Some(ProviderError::Unavailable("maintenance".into())));
        assert!(matches!(
            provider.create_invoice(request("x", Duration::from_secs(1))).await,
            Err(ProviderError::Unavailable(_))
        ));
        assert!(provider.is_paid("x").await.is_err());
        assert_eq!(provider.invoices_created(), 0);
    }
}
