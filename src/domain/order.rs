use super::invoice::InvoiceHandle;
use crate::error::{OrderError, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DESCRIPTION_MIN_CHARS: usize = 10;
pub const DESCRIPTION_MAX_CHARS: usize = 3000;
pub const REASON_MIN_CHARS: usize = 5;
pub const REASON_MAX_CHARS: usize = 1000;
/// Fiat amounts are billed in whole cents at most.
pub const PRICE_MAX_SCALE: u32 = 2;

/// Opaque order identifier supplied by the caller, usually derived from the
/// submission event so that a retried submission maps to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, used in human-facing labels.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group or channel the order was submitted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn bounded_text(value: String, min: usize, max: usize, what: &str) -> Result<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(OrderError::ValidationError(format!(
            "{what} must be between {min} and {max} characters, got {len}"
        )));
    }
    Ok(trimmed.to_string())
}

/// Free-text task description, trimmed and length-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Description(String);

impl Description {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        bounded_text(
            value.into(),
            DESCRIPTION_MIN_CHARS,
            DESCRIPTION_MAX_CHARS,
            "Description",
        )
        .map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Description {
    type Error = OrderError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Description> for String {
    fn from(value: Description) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RejectionReason(String);

impl RejectionReason {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        bounded_text(
            value.into(),
            REASON_MIN_CHARS,
            REASON_MAX_CHARS,
            "Rejection reason",
        )
        .map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RejectionReason {
    type Error = OrderError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RejectionReason> for String {
    fn from(value: RejectionReason) -> Self {
        value.0
    }
}

/// A strictly positive price.
///
/// Wraps `rust_decimal::Decimal` so an order can never be billed a zero or
/// negative amount, or an amount finer than the provider accepts.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(OrderError::ValidationError(
                "Price must be positive".to_string(),
            ));
        }
        let value = value.normalize();
        if value.scale() > PRICE_MAX_SCALE {
            return Err(OrderError::ValidationError(format!(
                "Price must have at most {PRICE_MAX_SCALE} decimal places"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = OrderError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    /// Priced and invoiced; waiting for the requester to pay.
    Accepted,
    Rejected,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Rejected | OrderStatus::Paid | OrderStatus::Cancelled
        )
    }

    /// Edges of the lifecycle graph. Self-loops are not transitions.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Accepted)
                | (OrderStatus::Pending, OrderStatus::Rejected)
                | (OrderStatus::Accepted, OrderStatus::Paid)
                | (OrderStatus::Accepted, OrderStatus::Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Price and invoice travel together: one cannot exist without the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Billing {
    pub price: Price,
    pub invoice_reference: String,
    pub invoice: InvoiceHandle,
}

/// Marks an invoice request in flight for a pending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingClaim {
    pub admin: ActorId,
    pub claimed_at: DateTime<Utc>,
}

impl PricingClaim {
    /// A lease reaching past the representable calendar never expires.
    pub fn is_live(&self, now: DateTime<Utc>, lease: ChronoDuration) -> bool {
        self.claimed_at
            .checked_add_signed(lease)
            .is_none_or(|expiry| now < expiry)
    }
}

/// A single service request moving through the lifecycle.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub requester: ActorId,
    pub description: Description,
    pub context: ContextId,
    pub status: OrderStatus,
    pub billing: Option<Billing>,
    pub rejection_reason: Option<RejectionReason>,
    pub pricing_claim: Option<PricingClaim>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: OrderId,
        requester: ActorId,
        description: Description,
        context: ContextId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            requester,
            description,
            context,
            status: OrderStatus::Pending,
            billing: None,
            rejection_reason: None,
            pricing_claim: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn price(&self) -> Option<Price> {
        self.billing.as_ref().map(|b| b.price)
    }

    pub fn invoice_reference(&self) -> Option<&str> {
        self.billing.as_ref().map(|b| b.invoice_reference.as_str())
    }

    fn expect_status(&self, expected: OrderStatus) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(OrderError::Conflict {
                id: self.id.clone(),
                expected,
                actual: self.status,
            })
        }
    }

    fn move_to(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::Conflict {
                id: self.id.clone(),
                expected: next,
                actual: self.status,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Reserves the right to request an invoice. Fails while another live
    /// claim exists; a claim past its lease is taken over.
    pub fn claim_pricing(
        &mut self,
        admin: ActorId,
        now: DateTime<Utc>,
        lease: ChronoDuration,
    ) -> Result<()> {
        self.expect_status(OrderStatus::Pending)?;
        if let Some(claim) = &self.pricing_claim
            && claim.is_live(now, lease)
        {
            return Err(OrderError::PricingInProgress(self.id.clone()));
        }
        self.pricing_claim = Some(PricingClaim {
            admin,
            claimed_at: now,
        });
        Ok(())
    }

    /// Drops the claim held by `admin`; a claim taken over by someone else is
    /// left alone.
    pub fn release_pricing(&mut self, admin: ActorId) {
        if self
            .pricing_claim
            .as_ref()
            .is_some_and(|claim| claim.admin == admin)
        {
            self.pricing_claim = None;
        }
    }

    pub fn accept(&mut self, admin: ActorId, billing: Billing, now: DateTime<Utc>) -> Result<()> {
        match &self.pricing_claim {
            Some(claim) if claim.admin == admin => {}
            _ => return Err(OrderError::PricingInProgress(self.id.clone())),
        }
        if billing.invoice_reference.is_empty() {
            return Err(OrderError::ValidationError(
                "Invoice reference must not be empty".to_string(),
            ));
        }
        self.move_to(OrderStatus::Accepted, now)?;
        self.billing = Some(billing);
        self.pricing_claim = None;
        Ok(())
    }

    pub fn reject(
        &mut self,
        reason: RejectionReason,
        now: DateTime<Utc>,
        lease: ChronoDuration,
    ) -> Result<()> {
        if self
            .pricing_claim
            .as_ref()
            .is_some_and(|claim| claim.is_live(now, lease))
        {
            return Err(OrderError::PricingInProgress(self.id.clone()));
        }
        self.move_to(OrderStatus::Rejected, now)?;
        self.rejection_reason = Some(reason);
        self.pricing_claim = None;
        Ok(())
    }

    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.move_to(OrderStatus::Paid, now)
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.move_to(OrderStatus::Cancelled, now)
    }
}
