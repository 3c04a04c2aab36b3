//! # pixelmill-store
//!
//! [`BlobStore`](pixelmill_core::traits::BlobStore) backends.
//!
//! The local filesystem store backs single-machine deployments and the
//! `demo` command; the in-memory store backs tests.

pub mod local;
pub mod memory;

pub use local::LocalBlobStore;
pub use memory::InMemoryBlobStore;
