use crate::error::{OrderError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Submit,
    Accept,
    Reject,
    /// The requester reports having paid; triggers a provider poll.
    Pay,
    Cancel,
    /// Provider-side event: the payer settles the sandbox invoice.
    Settle,
}

/// One row of an action log.
///
/// Which optional columns matter depends on `action`: `context` and `text`
/// (description) for submit, `amount` for accept, `text` (reason) for reject.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Action {
    pub action: ActionType,
    pub actor: Option<u64>,
    pub order: String,
    pub context: Option<u64>,
    pub amount: Option<Decimal>,
    pub text: Option<String>,
}

/// Reads actions from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Action>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct ActionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ActionReader<R> {
    /// Creates a new `ActionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes actions.
    pub fn actions(self) -> impl Iterator<Item = Result<Action>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(OrderError::from))
    }
}
