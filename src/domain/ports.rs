use super::invoice::{InvoiceHandle, InvoiceRequest};
use super::notification::Notification;
use super::order::{ActorId, Order, OrderId, OrderStatus};
use crate::error::{ProviderError, Result};
use async_trait::async_trait;

/// A fallible in-place edit applied by [`OrderRegistry::compare_and_swap`].
/// Returning an error discards the edit.
pub type OrderMutator = Box<dyn FnOnce(&mut Order) -> Result<()> + Send>;

/// Canonical store of orders.
///
/// `compare_and_swap` is the only way to change a stored order. It must check
/// `expected` and apply the mutator as one atomic step, so two concurrent
/// transitions on the same id can never both win.
#[async_trait]
pub trait OrderRegistry: Send + Sync {
    /// Stores a brand-new order. Fails with `DuplicateId` instead of
    /// overwriting.
    async fn create(&self, order: Order) -> Result<OrderId>;
    async fn get(&self, id: &OrderId) -> Result<Order>;
    async fn compare_and_swap(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        mutator: OrderMutator,
    ) -> Result<Order>;
    /// Every stored order, sorted by id.
    async fn all(&self) -> Result<Vec<Order>>;
}

/// External invoicing service.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Issues a new invoice. Not idempotent: every call may create a
    /// separate invoice.
    async fn create_invoice(
        &self,
        request: InvoiceRequest,
    ) -> std::result::Result<InvoiceHandle, ProviderError>;

    /// Whether the invoice correlated with `reference` has been observed
    /// paid. `false` only means "not yet".
    async fn is_paid(&self, reference: &str) -> std::result::Result<bool, ProviderError>;
}

pub trait Authorizer: Send + Sync {
    fn has_admin_capability(&self, actor: ActorId) -> bool;
}

/// Presentation side: renders notification intents.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

pub type OrderRegistryBox = Box<dyn OrderRegistry>;
pub type PaymentProviderBox = Box<dyn PaymentProvider>;
pub type AuthorizerBox = Box<dyn Authorizer>;
pub type NotifierBox = Box<dyn Notifier>;
pub type OrderRegistryFactory = Box<dyn Fn() -> OrderRegistryBox + Send + Sync>;
