//! Application layer: the live session controller, the category
//! service and the presentation-facing view projection.
//!
//! The hosting UI wires a gateway and a store into
//! [`LiveSessionController`], renders from [`ViewState`] snapshots and
//! the controller's event stream, and feeds user intents back in as
//! plain method calls.

pub mod category;
pub mod controller;
pub mod view;

pub use category::CategoryService;
pub use controller::LiveSessionController;
pub use view::ViewState;

use std::sync::Arc;

use bililink_core::error::Result;
use bililink_core::store::SessionStore;
use bililink_infrastructure::{TomlKeyValueStore, paths};

/// Opens the session store at its default platform location.
pub fn open_default_store() -> Result<SessionStore> {
    let store = TomlKeyValueStore::open(paths::store_file()?)?;
    Ok(SessionStore::new(Arc::new(store)))
}
