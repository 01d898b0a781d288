//! Remote session gateway trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::model::StreamCredentials;

/// The three remote operations of the live platform, normalized into a
/// uniform result. Implementations are pure request/response and carry
/// no session-state knowledge; each call is a single round trip with no
/// internal retry.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// True when the anti-forgery token is available.
    ///
    /// Lets the controller refuse a start before any remote call
    /// instead of discovering the missing token mid-sequence.
    fn has_credential(&self) -> bool;

    /// Updates the broadcast title.
    ///
    /// Fails soft: returns `false` on network error, non-2xx status,
    /// unparsable payload, embedded failure code, or a missing
    /// anti-forgery token. Never raises to the caller.
    async fn update_title(&self, room_id: &str, title: &str) -> bool;

    /// Starts the remote session and returns the issued ingest
    /// credentials.
    ///
    /// # Errors
    ///
    /// `LinkError::MissingCredential` if the anti-forgery token is
    /// absent (no network I/O is performed), `LinkError::Transport` on
    /// network failure, `LinkError::Application` carrying the
    /// platform's message text on an embedded failure code.
    async fn start_session(&self, room_id: &str, category_id: &str) -> Result<StreamCredentials>;

    /// Stops the remote session.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`SessionGateway::start_session`].
    async fn stop_session(&self, room_id: &str) -> Result<()>;
}
