use axum::routing::any;
use axum::Router;

use nv_app::Controller;

use crate::handlers::entry;
use crate::state::GatewayState;

pub struct GatewayController;

impl Controller<GatewayState> for GatewayController {
    fn routes() -> Router<GatewayState> {
        Router::new().route("/api/{*rest}", any(entry))
    }
}
