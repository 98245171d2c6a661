pub use axum::middleware::{from_fn, Next};
