use serde::{Deserialize, Serialize};

use super::model::SessionState;

/// High-level events emitted by the live session controller.
///
/// The presentation adapter consumes these to re-render; no business
/// data flows back through the same channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// The session state changed and was persisted.
    StateChanged { state: SessionState },
    /// Neutral or positive user-facing message.
    Info { message: String },
    /// User-facing failure message; the prior state is still valid.
    Error { message: String },
}
