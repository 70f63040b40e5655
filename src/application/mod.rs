//! Application layer containing the order lifecycle orchestration.
//!
//! `LifecycleEngine` is the entry point for every state change. It validates
//! an action against the stored order, talks to the payment provider when a
//! transition needs it, and commits the result with a compare-and-swap.

pub mod engine;
