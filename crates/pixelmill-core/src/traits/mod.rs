//! Port traits for the external collaborators.
//!
//! The blob store, the queue service, and the transformation command are
//! all consumed through these traits and injected at construction time,
//! so the coordination logic can be exercised against in-memory fakes.

pub mod blob_store;
pub mod queue;
pub mod transformer;

pub use blob_store::BlobStore;
pub use queue::{MessageQueue, ReceiptHandle, ReceiveOptions, ReceivedMessage};
pub use transformer::Transformer;
