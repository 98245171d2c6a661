pub use axum::routing::{delete, get, patch, post, put, Route};
