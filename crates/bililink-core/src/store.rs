//! Persistence seam and the typed session store built on top of it.
//!
//! The hosting environment provides durable string-keyed storage; this
//! module defines that seam ([`KeyValueStore`]) and a typed wrapper
//! ([`SessionStore`]) that owns the key names and the JSON encoding of
//! structured values.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::session::model::SessionState;
use crate::taxonomy::CachedTaxonomy;

/// Store key names, mirrored from the persisted layout.
pub mod keys {
    /// Full serialized [`SessionState`](crate::session::SessionState).
    pub const SESSION_STATE: &str = "session_state";
    /// Serialized [`CachedTaxonomy`](crate::taxonomy::CachedTaxonomy);
    /// groups and fetch timestamp live in one value so the pair is
    /// replaced atomically.
    pub const AREA_LIST: &str = "area_list";
    pub const LAST_ROOM_ID: &str = "last_room_id";
    pub const LAST_GROUP_ID: &str = "last_group_id";
    pub const LAST_AREA_ID: &str = "last_area_id";
    pub const LAST_TITLE: &str = "last_title";
}

/// Durable key/value persistence across page loads.
///
/// String keys, string values; structured values are JSON-encoded by
/// the callers. Implementations must make `set` durable before
/// returning.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores the value under the key, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Removes the key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Typed accessors over a [`KeyValueStore`].
///
/// Owns the key names and the serialization of structured values, so
/// the state model stays independent of its storage encoding.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    /// Loads the persisted session state, if any.
    ///
    /// A transient phase found in storage is coerced back to the
    /// nearest stable phase before being returned.
    pub async fn load_session(&self) -> Result<Option<SessionState>> {
        let Some(raw) = self.inner.get(keys::SESSION_STATE).await? else {
            return Ok(None);
        };
        let mut state: SessionState = serde_json::from_str(&raw)?;
        state.normalize_rehydrated();
        Ok(Some(state))
    }

    /// Persists the full session state.
    pub async fn save_session(&self, state: &SessionState) -> Result<()> {
        let raw = serde_json::to_string(state)?;
        self.inner.set(keys::SESSION_STATE, raw).await
    }

    /// Loads the cached taxonomy together with its fetch timestamp.
    pub async fn load_taxonomy_cache(&self) -> Result<Option<CachedTaxonomy>> {
        let Some(raw) = self.inner.get(keys::AREA_LIST).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Replaces the cached taxonomy and its timestamp in one write.
    pub async fn save_taxonomy_cache(&self, cached: &CachedTaxonomy) -> Result<()> {
        let raw = serde_json::to_string(cached)?;
        self.inner.set(keys::AREA_LIST, raw).await
    }

    // ------------------------------------------------------------------
    // Selection memory: advisory values used to pre-populate inputs.
    // Never authoritative over a live session's own persisted fields.
    // ------------------------------------------------------------------

    pub async fn last_room_id(&self) -> Result<Option<String>> {
        self.inner.get(keys::LAST_ROOM_ID).await
    }

    pub async fn set_last_room_id(&self, room_id: &str) -> Result<()> {
        self.inner.set(keys::LAST_ROOM_ID, room_id.to_string()).await
    }

    pub async fn last_group_id(&self) -> Result<Option<String>> {
        self.inner.get(keys::LAST_GROUP_ID).await
    }

    pub async fn set_last_group_id(&self, group_id: &str) -> Result<()> {
        self.inner
            .set(keys::LAST_GROUP_ID, group_id.to_string())
            .await
    }

    pub async fn last_area_id(&self) -> Result<Option<String>> {
        self.inner.get(keys::LAST_AREA_ID).await
    }

    pub async fn set_last_area_id(&self, area_id: &str) -> Result<()> {
        self.inner.set(keys::LAST_AREA_ID, area_id.to_string()).await
    }

    pub async fn last_title(&self) -> Result<Option<String>> {
        self.inner.get(keys::LAST_TITLE).await
    }

    pub async fn set_last_title(&self, title: &str) -> Result<()> {
        self.inner.set(keys::LAST_TITLE, title.to_string()).await
    }
}
