use crate::domain::order::{ActorId, OrderId, OrderStatus};
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a [`PaymentProvider`](crate::domain::ports::PaymentProvider).
///
/// None of these say anything about the order itself: the order keeps the
/// state it had before the call and the caller may try again.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
    #[error("payment provider rejected the request: {0}")]
    Rejected(String),
    #[error("payment provider did not answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Actor {actor} is not allowed to {action} order {order}")]
    Unauthorized {
        actor: ActorId,
        order: OrderId,
        action: &'static str,
    },
    #[error("Order {0} not found")]
    NotFound(OrderId),
    #[error("Order {0} already exists")]
    DuplicateId(OrderId),
    #[error("Order {id} already handled: expected {expected}, found {actual}")]
    Conflict {
        id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },
    #[error("Order {0} is being priced by another administrator")]
    PricingInProgress(OrderId),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Payment for order {0} not observed yet")]
    PaymentNotObserved(OrderId),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for OrderError {
    fn from(err: rocksdb::Error) -> Self {
        OrderError::InternalError(Box::new(err))
    }
}

impl From<serde_json::Error> for OrderError {
    fn from(err: serde_json::Error) -> Self {
        OrderError::InternalError(Box::new(err))
    }
}

/// Coarse classification a presentation layer uses to pick wording and
/// decide whether offering "try again" makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    Provider,
    PaymentNotObserved,
    Internal,
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::ValidationError(_) | OrderError::InvalidSettings(_) => {
                ErrorKind::Validation
            }
            OrderError::Unauthorized { .. } => ErrorKind::Authorization,
            OrderError::NotFound(_) => ErrorKind::NotFound,
            OrderError::DuplicateId(_)
            | OrderError::Conflict { .. }
            | OrderError::PricingInProgress(_) => ErrorKind::Conflict,
            OrderError::Provider(_) => ErrorKind::Provider,
            OrderError::PaymentNotObserved(_) => ErrorKind::PaymentNotObserved,
            OrderError::CsvError(_)
            | OrderError::IoError(_)
            | OrderError::ConfigError(_)
            | OrderError::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Transient outcomes: repeating the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Provider | ErrorKind::PaymentNotObserved
        )
    }
}

pub type Result<T> = std::result::Result<T, OrderError>;
