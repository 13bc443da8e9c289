//! Flare Registry Client
//!
//! Service-discovery client for a remote registry: registers workers, discovers peers and keeps
//! long-lived watch and heartbeat subscriptions alive across registry-node churn.
//!
//! - address pool with round-robin selection and periodic TCP reachability probes
//! - revision-based conditional instance lookups
//! - change-feed sessions that reconnect with exponential backoff

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod registry;
pub mod retry;
pub mod session;
pub mod transport;

// Re-exports
pub use client::{RegistryClient, RegistryClientBuilder};
pub use config::{CallOptions, Options, ReconnectConfig};
pub use error::{ErrorCategory, ErrorCode, RegistryError, Result};
pub use model::*;
pub use registry::{AddressPool, AddressStatus, RevisionCache, RoundRobin};
pub use retry::ExponentialBackoff;
pub use session::{FeedHandler, SessionState};
pub use transport::{
    Dialer, FeedConnection, FeedError, Frame, HttpRequest, HttpResponse, ReqwestTransport,
    Transport, WsDialer,
};
