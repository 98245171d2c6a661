use axum::http::StatusCode;

use nv_app::error::AppError;
use nv_contract::ContractError;

pub fn contract_error_to_app_error(err: ContractError) -> AppError {
    AppError::Custom {
        status: StatusCode::BAD_REQUEST,
        title: "contract_id_mismatch",
        detail: err.to_string(),
    }
}

pub fn writer_not_ready() -> AppError {
    AppError::Custom {
        status: StatusCode::SERVICE_UNAVAILABLE,
        title: "WAL_NOT_READY",
        detail: "audit store is not yet initialized".to_string(),
    }
}
