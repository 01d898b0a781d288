//! Presentation-facing projection of the session state.
//!
//! The adapter renders buttons and credential fields from this view;
//! it never reads the session state directly, so UI affordances always
//! agree with the state machine.

use serde::Serialize;

use bililink_core::session::model::{LivePhase, SessionState, StreamCredentials};

/// UI affordances derived from one [`SessionState`] snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewState {
    /// The start button is usable.
    pub start_enabled: bool,
    /// The stop button is usable.
    pub stop_enabled: bool,
    /// Room/category/title inputs accept edits.
    pub inputs_enabled: bool,
    /// Credentials to display, present only while live.
    pub credentials: Option<StreamCredentials>,
    /// Show the "session in progress" notice for a restored session.
    pub session_in_progress: bool,
}

impl From<&SessionState> for ViewState {
    fn from(state: &SessionState) -> Self {
        let live = state.phase == LivePhase::Live;
        Self {
            start_enabled: state.phase == LivePhase::Idle,
            stop_enabled: live,
            inputs_enabled: state.phase == LivePhase::Idle,
            credentials: state.credentials.clone(),
            session_in_progress: live,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_view() {
        let view = ViewState::from(&SessionState::new());
        assert!(view.start_enabled);
        assert!(!view.stop_enabled);
        assert!(view.inputs_enabled);
        assert!(view.credentials.is_none());
    }

    #[test]
    fn test_live_view_exposes_credentials() {
        let mut state = SessionState::new();
        state.begin_live(StreamCredentials {
            server_address: "rtmp://x".to_string(),
            stream_key: "k1".to_string(),
        });

        let view = ViewState::from(&state);
        assert!(!view.start_enabled);
        assert!(view.stop_enabled);
        assert!(!view.inputs_enabled);
        assert!(view.session_in_progress);
        assert_eq!(view.credentials.unwrap().stream_key, "k1");
    }

    #[test]
    fn test_transient_phases_disable_everything() {
        let mut state = SessionState::new();
        state.phase = LivePhase::Starting;
        let view = ViewState::from(&state);
        assert!(!view.start_enabled);
        assert!(!view.stop_enabled);
        assert!(!view.inputs_enabled);
    }
}
