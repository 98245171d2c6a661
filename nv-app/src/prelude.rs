//! Nv prelude — import everything you need with a single `use`.
//!
//! ```ignore
//! use nv_app::prelude::*;
//!
//! async fn handler() -> Json<String> {
//!     Json("hello".to_string())
//! }
//! ```

// ── Core types ───────────────────────────────────────────────────────────

pub use crate::builder::AppBuilder;
pub use crate::controller::Controller;
pub use crate::error::{AppError, Problem};
pub use crate::health::{HealthBuilder, HealthIndicator, HealthStatus};
pub use crate::plugin::Plugin;
pub use crate::plugins::{AdvancedHealth, Cors, ErrorHandling, Health, NormalizePath, Tracing};
pub use crate::request_id::{RequestId, RequestIdPlugin};
pub use crate::types::{ApiResult, JsonResult, StatusResult};

// ── HTTP re-exports ────────────────────────────────────────────────────────

pub use crate::http::{HeaderMap, Json, Router, StatusCode};
pub use crate::http::extract::{FromRef, Path, Query, State};
pub use crate::http::response::{IntoResponse, Response};
