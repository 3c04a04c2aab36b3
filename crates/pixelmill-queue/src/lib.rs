//! # pixelmill-queue
//!
//! An in-process [`MessageQueue`](pixelmill_core::traits::MessageQueue)
//! that models the contract of a hosted queue service: delivery delays,
//! long-poll receives, visibility timeouts, at-least-once redelivery,
//! and an optional redrive (dead-letter) policy.
//!
//! It backs single-process deployments, the `demo` command, and every
//! test of the coordination protocol.

pub mod memory;

pub use memory::InMemoryQueue;
