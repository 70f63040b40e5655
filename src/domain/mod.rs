//! Domain layer: the order entity, its value objects, and the ports the
//! lifecycle engine talks through.

pub mod invoice;
pub mod notification;
pub mod order;
pub mod ports;
