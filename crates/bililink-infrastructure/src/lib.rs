//! Persistence layer for the bililink workspace.
//!
//! Provides the durable [`KeyValueStore`] implementation backing the
//! typed session store, plus path resolution for its TOML document.
//!
//! [`KeyValueStore`]: bililink_core::store::KeyValueStore

pub mod kv_store;
pub mod paths;

pub use kv_store::{MemoryKeyValueStore, TomlKeyValueStore};
