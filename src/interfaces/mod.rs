//! Outer surfaces: CSV action logs in, order reports out, and rendering of
//! notification intents.

pub mod csv;
pub mod notifier;
pub mod replay;
