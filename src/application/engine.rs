use crate::config::Settings;
use crate::domain::invoice::InvoiceRequest;
use crate::domain::notification::{Notification, OrderEvent, Transition};
use crate::domain::order::{
    ActorId, Billing, ContextId, Description, Order, OrderId, OrderStatus, Price,
    RejectionReason,
};
use crate::domain::ports::{AuthorizerBox, OrderRegistryBox, PaymentProviderBox};
use crate::error::{OrderError, ProviderError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::future::Future;
use tracing::{debug, info, instrument, warn};

/// The order lifecycle state machine.
///
/// Every transition is validated against a snapshot and then applied through
/// a single compare-and-swap on the registry, so concurrent callers acting on
/// the same order observe a strict before/after ordering and at most one of
/// them wins. The engine never talks to users itself: each successful call
/// returns the notifications the caller has to dispatch.
pub struct LifecycleEngine {
    registry: OrderRegistryBox,
    provider: PaymentProviderBox,
    authorizer: AuthorizerBox,
    settings: Settings,
}

impl LifecycleEngine {
    /// Creates a new `LifecycleEngine`.
    ///
    /// # Arguments
    ///
    /// * `registry` - Canonical order store.
    /// * `provider` - Invoice provider used on accept and payment confirmation.
    /// * `authorizer` - Source of the administrator capability.
    /// * `settings` - Currency, invoice expiry, provider timeout and claim lease.
    pub fn new(
        registry: OrderRegistryBox,
        provider: PaymentProviderBox,
        authorizer: AuthorizerBox,
        settings: Settings,
    ) -> Self {
        Self {
            registry,
            provider,
            authorizer,
            settings,
        }
    }

    /// Registers a new pending order and announces it to the originating context.
    #[instrument(skip(self, description), fields(order = %id))]
    pub async fn submit(
        &self,
        actor: ActorId,
        id: OrderId,
        description: impl Into<String>,
        context: ContextId,
    ) -> Result<Transition> {
        let description = Description::new(description)?;
        let order = Order::new(id, actor, description, context, Utc::now());
        self.registry.create(order.clone()).await?;
        info!(order = %order.id, requester = %actor, "order submitted");

        let notifications = vec![Notification::to_context(
            &order,
            OrderEvent::NewOrder {
                description: order.description.as_str().to_string(),
                requester: order.requester,
            },
        )];
        Ok(Transition {
            order,
            notifications,
        })
    }

    /// Prices a pending order and issues its invoice.
    ///
    /// The invoice is requested only after this caller has claimed the order,
    /// so racing administrators cannot produce two invoices. A provider
    /// failure releases the claim and leaves the order pending.
    #[instrument(skip(self), fields(order = %id))]
    pub async fn accept(&self, actor: ActorId, id: &OrderId, price: Decimal) -> Result<Transition> {
        let price = Price::new(price)?;
        let order = self.registry.get(id).await?;
        self.require_admin(actor, &order, "accept")?;
        ensure_status(&order, OrderStatus::Pending)?;

        let lease = self.settings.claim_lease()?;
        self.registry
            .compare_and_swap(
                id,
                OrderStatus::Pending,
                Box::new(move |order: &mut Order| order.claim_pricing(actor, Utc::now(), lease)),
            )
            .await?;
        debug!(order = %id, admin = %actor, "pricing claimed");

        let request = InvoiceRequest {
            amount: price,
            reference: id.as_str().to_string(),
            currency: self.settings.currency.clone(),
            expires_in: self.settings.invoice_expiry(),
            description: format!("Order #{}", id.short()),
        };
        let invoice = match self
            .with_timeout(self.provider.create_invoice(request))
            .await
        {
            Ok(invoice) => invoice,
            Err(err) => {
                warn!(order = %id, error = %err, "invoice creation failed");
                self.release_claim(actor, id).await;
                return Err(err.into());
            }
        };

        let billing = Billing {
            price,
            invoice_reference: id.as_str().to_string(),
            invoice: invoice.clone(),
        };
        let order = self
            .registry
            .compare_and_swap(
                id,
                OrderStatus::Pending,
                Box::new(move |order: &mut Order| order.accept(actor, billing, Utc::now())),
            )
            .await
            .inspect_err(|err| {
                warn!(order = %id, invoice = %invoice.invoice_id, error = %err, "invoice issued but acceptance lost");
            })?;
        info!(order = %id, admin = %actor, %price, "order accepted");

        let notifications = vec![
            Notification::to_context(&order, OrderEvent::OrderAccepted { price }),
            Notification::to_requester(
                &order,
                OrderEvent::InvoiceIssued {
                    price,
                    currency: self.settings.currency.clone(),
                    payment_url: invoice.payment_url,
                    expires_in: self.settings.invoice_expiry(),
                },
            ),
        ];
        Ok(Transition {
            order,
            notifications,
        })
    }

    #[instrument(skip(self, reason), fields(order = %id))]
    pub async fn reject(
        &self,
        actor: ActorId,
        id: &OrderId,
        reason: impl Into<String>,
    ) -> Result<Transition> {
        let reason = RejectionReason::new(reason)?;
        let order = self.registry.get(id).await?;
        self.require_admin(actor, &order, "reject")?;

        let lease = self.settings.claim_lease()?;
        let stored_reason = reason.clone();
        let order = self
            .registry
            .compare_and_swap(
                id,
                OrderStatus::Pending,
                Box::new(move |order: &mut Order| order.reject(stored_reason, Utc::now(), lease)),
            )
            .await?;
        info!(order = %id, admin = %actor, "order rejected");

        let event = OrderEvent::OrderRejected {
            reason: reason.as_str().to_string(),
        };
        let notifications = vec![
            Notification::to_context(&order, event.clone()),
            Notification::to_requester(&order, event),
        ];
        Ok(Transition {
            order,
            notifications,
        })
    }

    /// Polls the provider and settles the order once payment is observed.
    ///
    /// An unpaid answer is reported as `PaymentNotObserved` and changes
    /// nothing; the requester may ask again later.
    #[instrument(skip(self), fields(order = %id))]
    pub async fn confirm_payment(&self, actor: ActorId, id: &OrderId) -> Result<Transition> {
        let order = self.registry.get(id).await?;
        require_requester(actor, &order, "confirm payment for")?;
        ensure_status(&order, OrderStatus::Accepted)?;

        let reference = order.invoice_reference().ok_or_else(|| {
            OrderError::InternalError(
                format!("accepted order {id} carries no invoice reference").into(),
            )
        })?;
        let paid = self
            .with_timeout(self.provider.is_paid(reference))
            .await?;
        if !paid {
            debug!(order = %id, "payment not observed yet");
            return Err(OrderError::PaymentNotObserved(id.clone()));
        }

        let order = self
            .registry
            .compare_and_swap(
                id,
                OrderStatus::Accepted,
                Box::new(|order: &mut Order| order.mark_paid(Utc::now())),
            )
            .await?;
        info!(order = %id, requester = %actor, "payment confirmed");

        let mut notifications = vec![Notification::to_requester(
            &order,
            OrderEvent::PaymentConfirmed,
        )];
        if let Some(price) = order.price() {
            notifications.push(Notification::to_context(
                &order,
                OrderEvent::PaymentReceived {
                    requester: order.requester,
                    price,
                },
            ));
        }
        Ok(Transition {
            order,
            notifications,
        })
    }

    #[instrument(skip(self), fields(order = %id))]
    pub async fn cancel(&self, actor: ActorId, id: &OrderId) -> Result<Transition> {
        let order = self.registry.get(id).await?;
        require_requester(actor, &order, "cancel")?;

        let order = self
            .registry
            .compare_and_swap(
                id,
                OrderStatus::Accepted,
                Box::new(|order: &mut Order| order.cancel(Utc::now())),
            )
            .await?;
        info!(order = %id, requester = %actor, "order cancelled");

        let notifications = vec![
            Notification::to_requester(&order, OrderEvent::OrderCancelled),
            Notification::to_context(&order, OrderEvent::OrderCancelled),
        ];
        Ok(Transition {
            order,
            notifications,
        })
    }

    pub async fn order(&self, id: &OrderId) -> Result<Order> {
        self.registry.get(id).await
    }

    /// Snapshot of every order, sorted by id.
    pub async fn orders(&self) -> Result<Vec<Order>> {
        self.registry.all().await
    }

    fn require_admin(&self, actor: ActorId, order: &Order, action: &'static str) -> Result<()> {
        if self.authorizer.has_admin_capability(actor) {
            Ok(())
        } else {
            Err(OrderError::Unauthorized {
                actor,
                order: order.id.clone(),
                action,
            })
        }
    }

    async fn with_timeout<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, ProviderError>>,
    ) -> std::result::Result<T, ProviderError> {
        let limit = self.settings.provider_timeout();
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| ProviderError::Timeout(limit))?
    }

    async fn release_claim(&self, actor: ActorId, id: &OrderId) {
        let released = self
            .registry
            .compare_and_swap(
                id,
                OrderStatus::Pending,
                Box::new(move |order: &mut Order| {
                    order.release_pricing(actor);
                    Ok(())
                }),
            )
            .await;
        if let Err(err) = released {
            warn!(order = %id, error = %err, "could not release pricing claim");
        }
    }
}

fn require_requester(actor: ActorId, order: &Order, action: &'static str) -> Result<()> {
    if order.requester == actor {
        Ok(())
    } else {
        Err(OrderError::Unauthorized {
            actor,
            order: order.id.clone(),
            action,
        })
    }
}

fn ensure_status(order: &Order, expected: OrderStatus) -> Result<()> {
    if order.status == expected {
        Ok(())
    } else {
        Err(OrderError::Conflict {
            id: order.id.clone(),
            expected,
            actual: order.status,
        })
    }
}
