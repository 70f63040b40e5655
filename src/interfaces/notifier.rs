use crate::domain::notification::{Notification, OrderEvent, Recipient};
use crate::domain::ports::Notifier;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Where a rendered notification ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    DirectMessage(u64),
    Channel(u64),
}

/// Renders notifications as structured log lines.
///
/// Context notifications go to the configured orders channel when one is
/// set, otherwise to the context the order came from.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier {
    orders_channel: Option<u64>,
}

impl TracingNotifier {
    pub fn new(orders_channel: Option<u64>) -> Self {
        Self { orders_channel }
    }

    pub fn destination(&self, recipient: Recipient) -> Destination {
        match recipient {
            Recipient::Requester(actor) => Destination::DirectMessage(actor.0),
            Recipient::Context(context) => {
                Destination::Channel(self.orders_channel.unwrap_or(context.0))
            }
        }
    }
}

/// Human-readable text for a notification.
pub fn render(notification: &Notification) -> String {
    let short = notification.order.short();
    match &notification.event {
        OrderEvent::NewOrder {
            description,
            requester,
        } => {
            let preview: String = description.chars().take(1500).collect();
            format!("New order #{short} from {requester}: {preview}")
        }
        OrderEvent::OrderAccepted { price } => {
            format!("Order #{short} accepted, price {price}")
        }
        OrderEvent::InvoiceIssued {
            price,
            currency,
            payment_url,
            expires_in,
        } => {
            let days = expires_in.as_secs() / 86_400;
            format!(
                "Your order #{short} was accepted. Pay {price} {currency} within {days} days: {payment_url}"
            )
        }
        OrderEvent::OrderRejected { reason } => {
            format!("Order #{short} rejected: {reason}")
        }
        OrderEvent::PaymentConfirmed => {
            format!("Payment for order #{short} confirmed, thank you")
        }
        OrderEvent::PaymentReceived { requester, price } => {
            format!("Order #{short} paid by {requester}, amount {price}")
        }
        OrderEvent::OrderCancelled => format!("Order #{short} cancelled"),
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let text = render(notification);
        match self.destination(notification.recipient) {
            Destination::DirectMessage(user) => {
                info!(target: "notifications", order = %notification.order, user, "{text}")
            }
            Destination::Channel(channel) => {
                info!(target: "notifications", order = %notification.order, channel, "{text}")
            }
        }
        Ok(())
    }
}
