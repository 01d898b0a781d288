//! Session domain: state model, controller events, gateway seam.

pub mod event;
pub mod gateway;
pub mod model;

pub use event::ControllerEvent;
pub use gateway::SessionGateway;
pub use model::{CredentialDrift, LivePhase, SessionState, StreamCredentials};
