use super::order::{ActorId, ContextId, Order, OrderId, Price};
use std::time::Duration;

/// Who a notification is meant for. The presentation layer decides how a
/// context maps to a concrete channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Requester(ActorId),
    Context(ContextId),
}

/// What happened, as plain data.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    NewOrder {
        description: String,
        requester: ActorId,
    },
    OrderAccepted {
        price: Price,
    },
    InvoiceIssued {
        price: Price,
        currency: String,
        payment_url: String,
        expires_in: Duration,
    },
    OrderRejected {
        reason: String,
    },
    PaymentConfirmed,
    PaymentReceived {
        requester: ActorId,
        price: Price,
    },
    OrderCancelled,
}

/// A notification intent produced by a lifecycle transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub order: OrderId,
    pub recipient: Recipient,
    pub event: OrderEvent,
}

impl Notification {
    pub fn to_requester(order: &Order, event: OrderEvent) -> Self {
        Self {
            order: order.id.clone(),
            recipient: Recipient::Requester(order.requester),
            event,
        }
    }

    pub fn to_context(order: &Order, event: OrderEvent) -> Self {
        Self {
            order: order.id.clone(),
            recipient: Recipient::Context(order.context),
            event,
        }
    }
}

/// Outcome of a successful transition: the new snapshot plus the
/// notifications the caller must dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub order: Order,
    pub notifications: Vec<Notification>,
}
