pub use axum::response::{Html, IntoResponse, Redirect, Response};
