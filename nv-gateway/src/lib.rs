//! Edge gateway: the mesh's one public entry point. Versioned health is
//! served unconditionally; every other `/api/<slug>/v<version>/...` request
//! runs the full DoS-guard / audit / proxy pipeline before reaching an
//! upstream service.

pub mod audit;
pub mod controller;
pub mod error;
pub mod handlers;
pub mod mirror_loader;
pub mod path;
pub mod ratelimit;
pub mod state;
pub mod writer;

pub use controller::GatewayController;
pub use mirror_loader::FacilitatorMirrorLoader;
pub use ratelimit::RateLimiter;
pub use state::GatewayState;
pub use writer::HttpAuditWriter;
