use axum::routing::post;
use axum::Router;

use nv_app::Controller;

use crate::handlers::post_entries;
use crate::state::AuditReceiverState;

pub struct AuditReceiverController;

impl Controller<AuditReceiverState> for AuditReceiverController {
    fn routes() -> Router<AuditReceiverState> {
        Router::new().route("/entries", post(post_entries))
    }
}
