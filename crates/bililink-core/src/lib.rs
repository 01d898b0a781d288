//! Domain layer for the bililink workspace.
//!
//! Holds the session state model and the trait seams the other crates
//! implement: the HTTP transport, the remote session gateway and the
//! key/value persistence collaborator. No I/O happens in this crate.

pub mod error;
pub mod session;
pub mod store;
pub mod taxonomy;
pub mod transport;

// Re-export common error type
pub use error::{LinkError, Result};
