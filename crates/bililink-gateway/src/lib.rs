//! HTTP gateway to the Bilibili live API.
//!
//! Implements the core crate's [`SessionGateway`] and
//! [`TaxonomyFetcher`] seams against the real platform endpoints, plus
//! the reqwest-backed [`Transport`] the host wires in.
//!
//! [`SessionGateway`]: bililink_core::session::SessionGateway
//! [`TaxonomyFetcher`]: bililink_core::taxonomy::TaxonomyFetcher
//! [`Transport`]: bililink_core::transport::Transport

pub mod api;
pub mod bilibili;
pub mod transport;

pub use bilibili::BiliGateway;
pub use transport::ReqwestTransport;
