use super::csv::action_reader::{Action, ActionType};
use crate::application::engine::LifecycleEngine;
use crate::domain::notification::Transition;
use crate::domain::order::{ActorId, ContextId, OrderId};
use crate::domain::ports::NotifierBox;
use crate::error::{OrderError, Result};
use crate::infrastructure::sandbox::SandboxPaymentProvider;
use tracing::warn;

/// Feeds recorded actions into the lifecycle engine and dispatches the
/// resulting notifications, the way the chat front end would.
pub struct Replayer {
    engine: LifecycleEngine,
    sandbox: SandboxPaymentProvider,
    notifier: NotifierBox,
}

impl Replayer {
    /// `sandbox` must be a handle to the same provider the engine was built with.
    pub fn new(
        engine: LifecycleEngine,
        sandbox: SandboxPaymentProvider,
        notifier: NotifierBox,
    ) -> Self {
        Self {
            engine,
            sandbox,
            notifier,
        }
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    pub async fn apply(&self, action: Action) -> Result<()> {
        let Action {
            action: kind,
            actor,
            order,
            context,
            amount,
            text,
        } = action;
        let id = OrderId::new(order);
        let need = |column: &str| missing(kind, &id, column);

        let transition = match kind {
            ActionType::Settle => {
                if !self.sandbox.mark_paid(id.as_str()) {
                    warn!(order = %id, "no payable invoice to settle");
                }
                return Ok(());
            }
            ActionType::Submit => {
                let actor = actor.map(ActorId).ok_or_else(|| need("actor"))?;
                let context = context.map(ContextId).ok_or_else(|| need("context"))?;
                let description = text.ok_or_else(|| need("text"))?;
                self.engine
                    .submit(actor, id.clone(), description, context)
                    .await?
            }
            ActionType::Accept => {
                let actor = actor.map(ActorId).ok_or_else(|| need("actor"))?;
                let price = amount.ok_or_else(|| need("amount"))?;
                self.engine.accept(actor, &id, price).await?
            }
            ActionType::Reject => {
                let actor = actor.map(ActorId).ok_or_else(|| need("actor"))?;
                let reason = text.ok_or_else(|| need("text"))?;
                self.engine.reject(actor, &id, reason).await?
            }
            ActionType::Pay => {
                let actor = actor.map(ActorId).ok_or_else(|| need("actor"))?;
                self.engine.confirm_payment(actor, &id).await?
            }
            ActionType::Cancel => {
                let actor = actor.map(ActorId).ok_or_else(|| need("actor"))?;
                self.engine.cancel(actor, &id).await?
            }
        };
        self.dispatch(transition).await
    }

    async fn dispatch(&self, transition: Transition) -> Result<()> {
        for notification in &transition.notifications {
            if let Err(e) = self.notifier.notify(notification).await {
                warn!(order = %notification.order, error = %e, "notification dropped");
            }
        }
        Ok(())
    }
}

fn missing(kind: ActionType, id: &OrderId, column: &str) -> OrderError {
    OrderError::ValidationError(format!(
        "{kind:?} on order {id} needs a value in column '{column}'"
    ))
}
