use axum::routing::{get, post};
use axum::Router;

use nv_app::Controller;

use crate::handlers::{get_mirror, post_mirror, resolve_by_path, resolve_by_query};
use crate::state::FacilitatorState;

pub struct FacilitatorController;

impl Controller<FacilitatorState> for FacilitatorController {
    fn routes() -> Router<FacilitatorState> {
        Router::new()
            .route("/mirror", get(get_mirror).post(post_mirror))
            .route("/resolve", get(resolve_by_query))
            .route("/resolve/{slug}/{version}", get(resolve_by_path))
    }
}
