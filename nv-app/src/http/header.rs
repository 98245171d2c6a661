pub use axum::http::Request as HttpRequest;
pub use axum::http::{
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST,
    LOCATION, ORIGIN, REFERER, SET_COOKIE, USER_AGENT,
};
