//! In-memory mirror of service-configuration records.
//!
//! [`MirrorStore`] is the facilitator's and gateway's shared view of
//! `slug@version -> ServiceConfigRecord`: a TTL-refreshed read-through cache
//! with a DB -> filesystem-LKG -> cold-start-fail fallback chain, and an
//! atomic push-replacement path for the facilitator's write side.

pub mod error;
pub mod lkg;
pub mod loader;
pub mod store;

pub use error::MirrorError;
pub use lkg::LkgStore;
pub use loader::MirrorDbLoader;
pub use store::MirrorStore;
