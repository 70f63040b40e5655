//! Adapters behind the domain ports: order storage, the sandbox invoice
//! provider and the static administrator roster.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod roster;
pub mod sandbox;
