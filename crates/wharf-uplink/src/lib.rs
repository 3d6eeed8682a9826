//! Upstream registry client for the wharf registry.
//!
//! An [`Uplink`] fetches package metadata from one configured upstream
//! registry with conditional-request caching: within the uplink's staleness
//! window no network call happens at all, and outside it a stored ETag is
//! replayed as `If-None-Match` so an unchanged upstream answers with a
//! cheap 304. Fetched bodies are validated before they are handed to the
//! merge engine; malformed upstream data must never reach local state.

pub mod client;
pub mod error;
pub mod http_client;

pub use client::{FetchOutcome, Uplink};
pub use error::{Result, UplinkError};
pub use http_client::ClientConfig;
