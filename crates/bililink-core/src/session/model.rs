//! Session domain model.
//!
//! This module contains the session state owned by the live session
//! controller. The controller is the only mutator; every other component
//! observes this state through events or the persisted copy.

use serde::{Deserialize, Serialize};

/// Which actions are currently permitted for the session.
///
/// `Starting` and `Stopping` are transient: they exist only for the
/// duration of one orchestrated action and are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LivePhase {
    /// No remote session exists; a start may be attempted.
    #[default]
    Idle,
    /// A start action is in flight.
    Starting,
    /// A remote session exists and credentials are held.
    Live,
    /// A stop action is in flight.
    Stopping,
}

impl LivePhase {
    /// True while a start or stop action is in flight.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }
}

/// The server address / stream key pair issued by the platform for one
/// session. Single-use: a consumed stream key cannot be reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCredentials {
    /// RTMP ingest server address.
    pub server_address: String,
    /// Stream key for the ingest server.
    pub stream_key: String,
}

/// Outcome of comparing freshly issued credentials against the ones
/// observed on the immediately preceding successful start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialDrift {
    /// No previous start to compare against.
    FirstIssue,
    /// Both fields match the previous start.
    Unchanged,
    /// Either field differs; the broadcaster must update encoder settings.
    Changed,
}

/// The full session state persisted across page loads.
///
/// Invariant: `credentials` is present if and only if `phase == Live`.
/// The transition methods below are the only way to move in or out of
/// `Live`, so the invariant cannot be broken from outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionState {
    /// Current lifecycle phase.
    pub phase: LivePhase,
    /// Identifier of the broadcast room. Required non-empty to start.
    pub room_id: String,
    /// Identifier of the selected leaf category. Required non-empty to start.
    pub category_id: String,
    /// Broadcast title. Required non-empty to start.
    pub title: String,
    /// Credentials for the current session; present only while `Live`.
    pub credentials: Option<StreamCredentials>,
    /// Credentials observed on the immediately preceding successful start.
    /// Used only for drift comparison; overwritten, never merged.
    pub previous_credentials: Option<StreamCredentials>,
}

impl SessionState {
    /// Creates a fresh idle session state.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a remote session is believed to exist.
    pub fn is_live(&self) -> bool {
        self.phase == LivePhase::Live
    }

    /// Compares freshly issued credentials against the previous start.
    pub fn observe_drift(&self, issued: &StreamCredentials) -> CredentialDrift {
        match &self.previous_credentials {
            None => CredentialDrift::FirstIssue,
            Some(prev) if prev == issued => CredentialDrift::Unchanged,
            Some(_) => CredentialDrift::Changed,
        }
    }

    /// Enters `Live` with the issued credentials and records them as the
    /// comparison baseline for the next start.
    pub fn begin_live(&mut self, issued: StreamCredentials) {
        self.previous_credentials = Some(issued.clone());
        self.credentials = Some(issued);
        self.phase = LivePhase::Live;
    }

    /// Returns to `Idle`, clearing the consumed credentials. The drift
    /// baseline in `previous_credentials` is kept for the next start.
    pub fn end_live(&mut self) {
        self.credentials = None;
        self.phase = LivePhase::Idle;
    }

    /// Repairs a state read back from storage.
    ///
    /// A transient phase can only be observed in storage if the process
    /// died mid-action; the in-flight action is lost either way, so the
    /// state is coerced back to the nearest stable phase.
    pub fn normalize_rehydrated(&mut self) {
        if self.phase.is_transient() {
            self.phase = if self.credentials.is_some() {
                LivePhase::Live
            } else {
                LivePhase::Idle
            };
        }
    }
}
