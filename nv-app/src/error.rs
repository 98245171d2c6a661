use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
    /// An error carrying a mesh-specific title (e.g. `contract_id_mismatch`,
    /// `mirror_unavailable`) that doesn't fit the generic variants above.
    /// Every component-specific error code from the audit/mirror/S2S
    /// subsystems is surfaced through this variant at the HTTP boundary.
    Custom {
        status: StatusCode,
        title: &'static str,
        detail: String,
    },
}

/// RFC 7807 "Problem Details for HTTP APIs" body.
///
/// `type` is always `"about:blank"`: this mesh identifies problems by
/// `title` rather than by minting a type URI per error code.
#[derive(Debug, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_: "about:blank",
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: None,
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self)).into_response()
    }
}

impl AppError {
    /// The HTTP status this error will render as.
    pub fn status(&self) -> StatusCode {
        self.parts().0
    }

    fn parts(&self) -> (StatusCode, &str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad Request"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
            AppError::Custom { status, title, .. } => (*status, title),
        }
    }

    fn detail(&self) -> &str {
        match self {
            AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::Internal(msg) => msg,
            AppError::Custom { detail, .. } => detail,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title) = self.parts();
        Problem::new(status, title.to_string(), self.detail().to_string()).into_response()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (_, title) = self.parts();
        write!(f, "{title}: {}", self.detail())
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_title_and_detail() {
        let err = AppError::NotFound("record missing".into());
        assert_eq!(err.to_string(), "Not Found: record missing");
    }

    #[test]
    fn parts_map_to_expected_status_codes() {
        assert_eq!(AppError::BadRequest("x".into()).parts().0, StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).parts().0, StatusCode::CONFLICT);
        assert_eq!(
            AppError::Internal("x".into()).parts().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn custom_variant_carries_mesh_specific_title() {
        let err = AppError::Custom {
            status: StatusCode::SERVICE_UNAVAILABLE,
            title: "mirror_unavailable",
            detail: "no db and no lkg".into(),
        };
        assert_eq!(err.parts().1, "mirror_unavailable");
    }

    #[test]
    fn problem_type_is_always_about_blank() {
        let problem = Problem::new(StatusCode::NOT_FOUND, "Not Found", "x");
        assert_eq!(problem.type_, "about:blank");
    }
}
