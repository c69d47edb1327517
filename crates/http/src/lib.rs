//! Peerza HTTP client
//!
//! Typed access to the Peerza REST API with transparent session renewal.
//! Credentials live in an injected [`SessionStore`]; when the session cannot
//! be renewed the client publishes [`SessionEvent::Expired`] and returns
//! [`ClientError::SessionExpired`], leaving navigation to the caller.

pub mod client;
pub mod types;

pub use client::{
    ApiRequest, ClientError, FileSessionStore, MemorySessionStore, PeerzaClient,
    PeerzaClientBuilder, Poller, SessionEvent, SessionEvents, SessionStore,
};
