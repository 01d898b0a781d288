//! The live session controller.
//!
//! Owns the [`SessionState`] and sequences the remote calls for the
//! start/stop lifecycle: set title, start stream, obtain credentials;
//! confirm, stop stream. Every stable transition is persisted so the
//! session survives page reloads, and every outcome is surfaced to the
//! presentation adapter as a [`ControllerEvent`].

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use bililink_core::error::LinkError;
use bililink_core::session::event::ControllerEvent;
use bililink_core::session::gateway::SessionGateway;
use bililink_core::session::model::{CredentialDrift, LivePhase, SessionState};
use bililink_core::store::SessionStore;

/// Orchestrates the live session lifecycle against the remote gateway.
///
/// All mutation of [`SessionState`] happens here. Re-entrancy is guarded
/// by the phase itself: a `start` or `stop` intent arriving while an
/// action is in flight is ignored, so no two remote sequences can
/// overlap for the same session.
pub struct LiveSessionController {
    state: Mutex<SessionState>,
    gateway: Arc<dyn SessionGateway>,
    store: SessionStore,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl LiveSessionController {
    /// Creates the controller, rehydrating persisted state.
    ///
    /// When the persisted phase is `Live` the stored credentials are
    /// trusted and re-rendered without any remote call: the platform
    /// holds the authoritative session and a redundant start would
    /// invalidate the still-valid stream key. Unreadable persisted
    /// state falls back to a fresh idle session.
    ///
    /// Returns the controller and the receiver for its events.
    pub async fn new(
        gateway: Arc<dyn SessionGateway>,
        store: SessionStore,
    ) -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();

        let state = match store.load_session().await {
            Ok(Some(state)) => state,
            Ok(None) => SessionState::new(),
            Err(e) => {
                warn!(error = %e, "persisted session state unreadable, starting fresh");
                SessionState::new()
            }
        };

        let controller = Self {
            state: Mutex::new(state),
            gateway,
            store,
            events,
        };

        {
            let state = controller.state.lock().await;
            if state.is_live() {
                debug!(room_id = %state.room_id, "live session rehydrated");
                controller.emit_state(&state);
                controller.info("live session restored; credentials are still in use");
            }
        }

        (controller, receiver)
    }

    /// Returns a snapshot of the current session state.
    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Starts a live session: validate, set title, obtain credentials.
    ///
    /// The title update strictly precedes the start call; credentials
    /// are never requested for an unconfirmed title. Any failure aborts
    /// back to `Idle` with the prior persisted state untouched, and the
    /// reason is surfaced as an error event. A request arriving while
    /// another action is in flight is ignored.
    pub async fn start(&self, room_id: &str, category_id: &str, title: &str) {
        let room_id = room_id.trim().to_string();
        let title = title.trim().to_string();

        {
            let mut state = self.state.lock().await;
            match state.phase {
                LivePhase::Starting | LivePhase::Stopping => {
                    debug!("start ignored: another action is in flight");
                    return;
                }
                LivePhase::Live => {
                    self.error("a live session is already running");
                    return;
                }
                LivePhase::Idle => {}
            }

            if room_id.is_empty() {
                self.error("room id is required");
                return;
            }
            if title.is_empty() {
                self.error("a broadcast title is required");
                return;
            }
            if category_id.is_empty() {
                self.error("a category must be selected");
                return;
            }
            if !self.gateway.has_credential() {
                self.error(&LinkError::MissingCredential.to_string());
                return;
            }

            state.phase = LivePhase::Starting;
            self.emit_state(&state);
        }

        // The title must be confirmed before credential issuance.
        if !self.gateway.update_title(&room_id, &title).await {
            self.abort_to_idle("title update failed; check that you are signed in and own this room")
                .await;
            return;
        }

        let issued = match self.gateway.start_session(&room_id, category_id).await {
            Ok(issued) => issued,
            Err(e) => {
                self.abort_to_idle(&e.to_string()).await;
                return;
            }
        };

        let drift = {
            let mut state = self.state.lock().await;
            let drift = state.observe_drift(&issued);
            state.room_id = room_id;
            state.category_id = category_id.to_string();
            state.title = title;
            state.begin_live(issued);
            self.persist(&state).await;
            self.emit_state(&state);
            drift
        };

        match drift {
            CredentialDrift::FirstIssue => self.info("stream credentials issued"),
            CredentialDrift::Unchanged => {
                self.info("stream credentials unchanged since the last session")
            }
            CredentialDrift::Changed => {
                self.info("stream credentials changed, update your encoder settings")
            }
        }
    }

    /// Stops the live session.
    ///
    /// No-op unless the phase is `Live`. The stop is destructive and
    /// irreversible (a consumed stream key cannot be reused), so it
    /// requires explicit confirmation; an unconfirmed request performs
    /// no remote call. On gateway failure the phase stays `Live`
    /// because the remote session state is unknown.
    pub async fn stop(&self, confirmed: bool) {
        let room_id = {
            let mut state = self.state.lock().await;
            match state.phase {
                LivePhase::Starting | LivePhase::Stopping => {
                    debug!("stop ignored: another action is in flight");
                    return;
                }
                LivePhase::Idle => {
                    debug!("stop ignored: no live session");
                    return;
                }
                LivePhase::Live => {}
            }

            if !confirmed {
                self.info("stopping ends the session for good; confirm to proceed");
                return;
            }

            state.phase = LivePhase::Stopping;
            self.emit_state(&state);
            state.room_id.clone()
        };

        match self.gateway.stop_session(&room_id).await {
            Ok(()) => {
                let mut state = self.state.lock().await;
                state.end_live();
                self.persist(&state).await;
                self.emit_state(&state);
                drop(state);
                self.info("live session ended");
            }
            Err(e) => {
                let mut state = self.state.lock().await;
                state.phase = LivePhase::Live;
                self.emit_state(&state);
                drop(state);
                self.error(&e.to_string());
            }
        }
    }

    /// Aborts an in-flight start back to `Idle` and surfaces the reason.
    async fn abort_to_idle(&self, message: &str) {
        let mut state = self.state.lock().await;
        state.phase = LivePhase::Idle;
        self.emit_state(&state);
        drop(state);
        self.error(message);
    }

    /// Persists a stable state; persistence failure is surfaced but
    /// does not roll back the in-memory state, which tracks the remote
    /// session authoritatively.
    async fn persist(&self, state: &SessionState) {
        if let Err(e) = self.store.save_session(state).await {
            warn!(error = %e, "failed to persist session state");
            self.error(&format!("failed to persist session state: {e}"));
        }
    }

    fn emit(&self, event: ControllerEvent) {
        // A dropped receiver only means nothing is rendering.
        let _ = self.events.send(event);
    }

    fn emit_state(&self, state: &SessionState) {
        self.emit(ControllerEvent::StateChanged {
            state: state.clone(),
        });
    }

    fn info(&self, message: &str) {
        self.emit(ControllerEvent::Info {
            message: message.to_string(),
        });
    }

    fn error(&self, message: &str) {
        self.emit(ControllerEvent::Error {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bililink_core::error::Result;
    use bililink_core::session::model::StreamCredentials;
    use bililink_infrastructure::MemoryKeyValueStore;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct FakeGateway {
        credential: bool,
        title_ok: bool,
        start_reply: StdMutex<Result<StreamCredentials>>,
        stop_reply: StdMutex<Result<()>>,
        title_calls: AtomicUsize,
        start_calls: AtomicUsize,
        stop_calls: AtomicUsize,
        title_gate: StdMutex<Option<Arc<Notify>>>,
    }

    impl FakeGateway {
        fn ok() -> Self {
            Self {
                credential: true,
                title_ok: true,
                start_reply: StdMutex::new(Ok(creds("rtmp://x", "k1"))),
                stop_reply: StdMutex::new(Ok(())),
                title_calls: AtomicUsize::new(0),
                start_calls: AtomicUsize::new(0),
                stop_calls: AtomicUsize::new(0),
                title_gate: StdMutex::new(None),
            }
        }

        fn with_start_failure(message: &str) -> Self {
            let gateway = Self::ok();
            *gateway.start_reply.lock().unwrap() = Err(LinkError::application(message));
            gateway
        }

        fn title_calls(&self) -> usize {
            self.title_calls.load(Ordering::SeqCst)
        }

        fn start_calls(&self) -> usize {
            self.start_calls.load(Ordering::SeqCst)
        }

        fn stop_calls(&self) -> usize {
            self.stop_calls.load(Ordering::SeqCst)
        }

        fn remote_calls(&self) -> usize {
            self.title_calls() + self.start_calls() + self.stop_calls()
        }
    }

    #[async_trait]
    impl SessionGateway for FakeGateway {
        fn has_credential(&self) -> bool {
            self.credential
        }

        async fn update_title(&self, _room_id: &str, _title: &str) -> bool {
            self.title_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.title_gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.title_ok
        }

        async fn start_session(
            &self,
            _room_id: &str,
            _category_id: &str,
        ) -> Result<StreamCredentials> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            self.start_reply.lock().unwrap().clone()
        }

        async fn stop_session(&self, _room_id: &str) -> Result<()> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            self.stop_reply.lock().unwrap().clone()
        }
    }

    fn creds(addr: &str, key: &str) -> StreamCredentials {
        StreamCredentials {
            server_address: addr.to_string(),
            stream_key: key.to_string(),
        }
    }

    fn memory_store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryKeyValueStore::new()))
    }

    async fn controller_with(
        gateway: &Arc<FakeGateway>,
        store: SessionStore,
    ) -> (
        LiveSessionController,
        mpsc::UnboundedReceiver<ControllerEvent>,
    ) {
        LiveSessionController::new(gateway.clone(), store).await
    }

    fn drain(receiver: &mut mpsc::UnboundedReceiver<ControllerEvent>) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    fn error_messages(events: &[ControllerEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                ControllerEvent::Error { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn info_messages(events: &[ControllerEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                ControllerEvent::Info { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn assert_invariant(state: &SessionState) {
        assert_eq!(state.credentials.is_some(), state.phase == LivePhase::Live);
    }

    #[tokio::test]
    async fn test_start_success_goes_live() {
        let gateway = Arc::new(FakeGateway::ok());
        let store = memory_store();
        let (controller, mut rx) = controller_with(&gateway, store.clone()).await;

        controller.start("123", "A1", "Test").await;

        let state = controller.state().await;
        assert_eq!(state.phase, LivePhase::Live);
        assert_eq!(state.credentials, Some(creds("rtmp://x", "k1")));
        assert_eq!(state.room_id, "123");
        assert_eq!(state.title, "Test");
        assert_invariant(&state);

        // Persisted and reloadable.
        let persisted = store.load_session().await.unwrap().unwrap();
        assert_eq!(persisted, state);

        let events = drain(&mut rx);
        assert!(error_messages(&events).is_empty());
    }

    #[tokio::test]
    async fn test_title_failure_skips_start_session() {
        let gateway = Arc::new(FakeGateway {
            title_ok: false,
            ..FakeGateway::ok()
        });
        let (controller, mut rx) = controller_with(&gateway, memory_store()).await;

        controller.start("123", "A1", "Test").await;

        assert_eq!(gateway.title_calls(), 1);
        assert_eq!(gateway.start_calls(), 0);

        let state = controller.state().await;
        assert_eq!(state.phase, LivePhase::Idle);
        assert_invariant(&state);

        let errors = error_messages(&drain(&mut rx));
        assert!(errors.iter().any(|m| m.contains("title update failed")));
    }

    #[tokio::test]
    async fn test_start_failure_reason_surfaced_verbatim() {
        let gateway = Arc::new(FakeGateway::with_start_failure("room banned"));
        let (controller, mut rx) = controller_with(&gateway, memory_store()).await;

        controller.start("123", "A1", "Test").await;

        let state = controller.state().await;
        assert_eq!(state.phase, LivePhase::Idle);
        assert!(state.credentials.is_none());
        assert_invariant(&state);

        let errors = error_messages(&drain(&mut rx));
        assert_eq!(errors, vec!["room banned".to_string()]);
    }

    #[tokio::test]
    async fn test_validation_failures_make_no_remote_call() {
        let gateway = Arc::new(FakeGateway::ok());
        let (controller, mut rx) = controller_with(&gateway, memory_store()).await;

        controller.start("", "A1", "Test").await;
        controller.start("123", "A1", "   ").await;
        controller.start("123", "", "Test").await;

        assert_eq!(gateway.remote_calls(), 0);
        assert_eq!(controller.state().await.phase, LivePhase::Idle);
        assert_eq!(error_messages(&drain(&mut rx)).len(), 3);
    }

    #[tokio::test]
    async fn test_missing_token_aborts_before_any_call() {
        let gateway = Arc::new(FakeGateway {
            credential: false,
            ..FakeGateway::ok()
        });
        let (controller, mut rx) = controller_with(&gateway, memory_store()).await;

        controller.start("123", "A1", "Test").await;

        assert_eq!(gateway.remote_calls(), 0);
        let errors = error_messages(&drain(&mut rx));
        assert!(errors[0].contains("anti-forgery token missing"));
    }

    #[tokio::test]
    async fn test_drift_detection_across_starts() {
        let gateway = Arc::new(FakeGateway::ok());
        let store = memory_store();

        // First start: nothing to compare against.
        let (controller, mut rx) = controller_with(&gateway, store.clone()).await;
        controller.start("123", "A1", "Test").await;
        let infos = info_messages(&drain(&mut rx));
        assert!(infos.iter().any(|m| m.contains("issued")));
        controller.stop(true).await;

        // Same credentials again: unchanged.
        let (controller, mut rx) = controller_with(&gateway, store.clone()).await;
        controller.start("123", "A1", "Test").await;
        let infos = info_messages(&drain(&mut rx));
        assert!(infos.iter().any(|m| m.contains("unchanged")));
        controller.stop(true).await;

        // Different key: changed, and the baseline moves forward.
        *gateway.start_reply.lock().unwrap() = Ok(creds("rtmp://x", "k2"));
        let (controller, mut rx) = controller_with(&gateway, store.clone()).await;
        controller.start("123", "A1", "Test").await;
        let infos = info_messages(&drain(&mut rx));
        assert!(infos.iter().any(|m| m.contains("changed")));
        assert_eq!(
            controller.state().await.previous_credentials,
            Some(creds("rtmp://x", "k2"))
        );
    }

    #[tokio::test]
    async fn test_failed_start_keeps_previous_baseline() {
        let gateway = Arc::new(FakeGateway::ok());
        let store = memory_store();
        let (controller, _rx) = controller_with(&gateway, store.clone()).await;
        controller.start("123", "A1", "Test").await;
        controller.stop(true).await;

        *gateway.start_reply.lock().unwrap() = Err(LinkError::application("room banned"));
        controller.start("123", "A1", "Test").await;

        // The baseline still points at the last successful start.
        assert_eq!(
            controller.state().await.previous_credentials,
            Some(creds("rtmp://x", "k1"))
        );
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_a_no_op() {
        let gateway = Arc::new(FakeGateway::ok());
        let (controller, mut rx) = controller_with(&gateway, memory_store()).await;

        let before = controller.state().await;
        controller.stop(true).await;

        assert_eq!(gateway.remote_calls(), 0);
        assert_eq!(controller.state().await, before);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_stop_without_confirmation_makes_no_call() {
        let gateway = Arc::new(FakeGateway::ok());
        let (controller, mut rx) = controller_with(&gateway, memory_store()).await;
        controller.start("123", "A1", "Test").await;
        drain(&mut rx);

        controller.stop(false).await;

        assert_eq!(gateway.stop_calls(), 0);
        assert_eq!(controller.state().await.phase, LivePhase::Live);
    }

    #[tokio::test]
    async fn test_confirmed_stop_returns_to_idle() {
        let gateway = Arc::new(FakeGateway::ok());
        let store = memory_store();
        let (controller, _rx) = controller_with(&gateway, store.clone()).await;
        controller.start("123", "A1", "Test").await;

        controller.stop(true).await;

        let state = controller.state().await;
        assert_eq!(state.phase, LivePhase::Idle);
        assert!(state.credentials.is_none());
        assert_invariant(&state);

        let persisted = store.load_session().await.unwrap().unwrap();
        assert_eq!(persisted.phase, LivePhase::Idle);
    }

    #[tokio::test]
    async fn test_stop_failure_stays_live() {
        let gateway = Arc::new(FakeGateway::ok());
        *gateway.stop_reply.lock().unwrap() = Err(LinkError::transport("connection reset"));
        let (controller, mut rx) = controller_with(&gateway, memory_store()).await;
        controller.start("123", "A1", "Test").await;
        drain(&mut rx);

        controller.stop(true).await;

        // Remote state is unknown; local state is not cleared optimistically.
        let state = controller.state().await;
        assert_eq!(state.phase, LivePhase::Live);
        assert!(state.credentials.is_some());
        assert!(!error_messages(&drain(&mut rx)).is_empty());
    }

    #[tokio::test]
    async fn test_rehydration_live_makes_no_gateway_call() {
        let gateway = Arc::new(FakeGateway::ok());
        let store = memory_store();
        {
            let (controller, _rx) = controller_with(&gateway, store.clone()).await;
            controller.start("123", "A1", "Test").await;
        }
        let calls_before = gateway.remote_calls();

        let (controller, mut rx) = controller_with(&gateway, store).await;

        assert_eq!(gateway.remote_calls(), calls_before);
        let state = controller.state().await;
        assert_eq!(state.phase, LivePhase::Live);
        assert_eq!(state.credentials, Some(creds("rtmp://x", "k1")));

        // The restored state is re-announced for rendering.
        let events = drain(&mut rx);
        assert!(matches!(events[0], ControllerEvent::StateChanged { .. }));
    }

    #[tokio::test]
    async fn test_start_while_live_is_refused() {
        let gateway = Arc::new(FakeGateway::ok());
        let (controller, mut rx) = controller_with(&gateway, memory_store()).await;
        controller.start("123", "A1", "Test").await;
        let calls = gateway.remote_calls();
        drain(&mut rx);

        controller.start("123", "A1", "Test").await;

        assert_eq!(gateway.remote_calls(), calls);
        assert!(!error_messages(&drain(&mut rx)).is_empty());
    }

    #[tokio::test]
    async fn test_start_while_starting_is_ignored() {
        let gateway = Arc::new(FakeGateway::ok());
        let gate = Arc::new(Notify::new());
        *gateway.title_gate.lock().unwrap() = Some(gate.clone());

        let (controller, _rx) = controller_with(&gateway, memory_store()).await;
        let controller = Arc::new(controller);

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start("123", "A1", "Test").await })
        };
        // Let the first start reach the in-flight title call.
        tokio::task::yield_now().await;

        // A second click during `Starting` is silently ignored.
        controller.start("123", "A1", "Test").await;

        gate.notify_one();
        first.await.unwrap();

        assert_eq!(gateway.title_calls(), 1);
        assert_eq!(gateway.start_calls(), 1);
        assert_eq!(controller.state().await.phase, LivePhase::Live);
    }
}
