use crate::domain::order::Order;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Flat view of an order as written to the report.
#[derive(Debug, Serialize)]
struct OrderRecord<'a> {
    order: &'a str,
    requester: u64,
    context: u64,
    status: String,
    price: Option<Decimal>,
    invoice: Option<&'a str>,
    reason: Option<&'a str>,
}

impl<'a> From<&'a Order> for OrderRecord<'a> {
    fn from(order: &'a Order) -> Self {
        Self {
            order: order.id.as_str(),
            requester: order.requester.0,
            context: order.context.0,
            status: order.status.to_string(),
            price: order.price().map(Decimal::from),
            invoice: order.billing.as_ref().map(|b| b.invoice.invoice_id.as_str()),
            reason: order.rejection_reason.as_ref().map(|r| r.as_str()),
        }
    }
}

/// Writes order snapshots as CSV.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes a header followed by one row per order, then flushes.
    pub fn write_orders(&mut self, orders: Vec<Order>) -> Result<()> {
        if orders.is_empty() {
            self.writer.write_record([
                "order",
                "requester",
                "context",
                "status",
                "price",
                "invoice",
                "reason",
            ])?;
        }
        for order in &orders {
            self.writer.serialize(OrderRecord::from(order))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
