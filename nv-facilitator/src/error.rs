use nv_app::error::AppError;
use nv_mirror::MirrorError;

/// Maps facilitator-internal failures onto the shared RFC 7807 boundary.
pub fn mirror_error_to_app_error(err: MirrorError) -> AppError {
    match err {
        MirrorError::ColdStartNoDbNoLkg => AppError::Custom {
            status: axum::http::StatusCode::SERVICE_UNAVAILABLE,
            title: "mirror_unavailable",
            detail: err.to_string(),
        },
        other => AppError::Internal(other.to_string()),
    }
}
