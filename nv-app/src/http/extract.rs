pub use axum::extract::{
    ConnectInfo, DefaultBodyLimit, Extension as ExtExtension, Form, FromRef, FromRequest,
    FromRequestParts, MatchedPath, OriginalUri, Path, Query, Request, State,
};
