use super::order::Price;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Everything a provider needs to issue one invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRequest {
    pub amount: Price,
    /// Correlation token echoed back by the provider; later passed to `is_paid`.
    pub reference: String,
    pub currency: String,
    pub expires_in: Duration,
    pub description: String,
}

/// Provider-side identity of an issued invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceHandle {
    pub invoice_id: String,
    pub payment_url: String,
}
