pub mod body;
pub mod extract;
pub mod header;
pub mod middleware;
pub mod response;
pub mod routing;

pub use axum::{serve, Extension, Json, Router};
pub use axum::http::Uri;
pub use self::extract::{FromRef, FromRequest, FromRequestParts, Path, Query, State};
pub use self::header::{HeaderMap, StatusCode};
pub use self::response::{Html, IntoResponse, Response};
