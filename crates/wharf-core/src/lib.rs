//! Metadata merge engine and storage facade for the wharf registry.
//!
//! This crate ties the workspace together. [`Storage`] is the single entry
//! point callers use: it answers metadata reads by reconciling the local
//! package document with every configured uplink, accepts publishes with
//! local and remote existence checks, and drives the tarball transfer
//! pipeline with integrity hashing. The merge semantics live in
//! [`merge::merge_uplink_response`]; everything it writes goes through the
//! document store's optimistic update protocol.

pub mod access;
pub mod error;
pub mod logging;
pub mod merge;
pub mod storage;
pub mod tarball;

pub use access::{AccessChain, AccessProvider, Action};
pub use error::{Result, WharfError};
pub use logging::setup_logging;
pub use merge::merge_uplink_response;
pub use storage::Storage;
pub use tarball::TarballUpload;

pub use wharf_store::TarballReader;
