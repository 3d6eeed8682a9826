//! Configuration for the wharf package registry.
//!
//! The registry is configured from a single TOML file: a storage root, a
//! publish policy, and an ordered list of uplink declarations. The
//! declaration order of uplinks is load-bearing: it is the order uplinks
//! are contacted and merged in, and therefore the tie-break for conflicting
//! tag/readme/time data.
//!
//! There is no global configuration state; a [`Config`] value is loaded
//! once at startup and passed explicitly into every component constructor.

pub mod config;
pub mod error;
pub mod uplink;

pub use config::{Config, PublishPolicy};
pub use error::{ConfigError, Result};
pub use uplink::UplinkConfig;
