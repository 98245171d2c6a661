use axum::http::StatusCode;

use nv_app::error::AppError;

pub fn not_found(detail: impl Into<String>) -> AppError {
    AppError::Custom { status: StatusCode::NOT_FOUND, title: "not_found", detail: detail.into() }
}

pub fn bad_gateway(detail: impl Into<String>) -> AppError {
    AppError::Custom { status: StatusCode::BAD_GATEWAY, title: "bad_gateway", detail: detail.into() }
}

pub fn gateway_timeout(detail: impl Into<String>) -> AppError {
    AppError::Custom { status: StatusCode::GATEWAY_TIMEOUT, title: "gateway_timeout", detail: detail.into() }
}

pub fn audit_begin_hard_stop(detail: impl Into<String>) -> AppError {
    AppError::Custom { status: StatusCode::INTERNAL_SERVER_ERROR, title: "audit_begin_hard_stop", detail: detail.into() }
}

pub fn bad_request(detail: impl Into<String>) -> AppError {
    AppError::Custom { status: StatusCode::BAD_REQUEST, title: "bad_request", detail: detail.into() }
}
