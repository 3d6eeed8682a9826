//! Package document and tarball storage for the wharf registry.
//!
//! Persistence is one JSON document per package plus tarball files stored
//! as siblings of the document. All document mutation flows through the
//! read-mutate-stamp-persist protocol of [`PackageStore::update_document`]:
//! the only concurrency control in the system is the optimistic revision
//! check performed there. A detected race surfaces as
//! [`StoreError::RevisionMismatch`] and the caller decides whether to
//! retry.

pub mod error;
pub mod resource;
pub mod store;
pub mod tarball;

pub use error::{ErrorContext, Result, StoreError};
pub use store::PackageStore;
pub use tarball::{TarballReader, TarballWriter};
