pub mod beans;
pub mod builder;
pub mod config;
pub mod controller;
pub mod error;
pub mod health;
pub mod http;
pub mod layers;
pub mod lifecycle;
pub mod openapi;
pub mod plugin;
pub mod plugins;
pub mod prelude;
pub mod request_id;
pub mod state;
pub mod types;

pub use beans::{Bean, BeanContext, BeanError, BeanRegistry, BeanState};
pub use builder::AppBuilder;
pub use config::NvConfig;
pub use controller::Controller;
pub use error::{AppError, Problem};
pub use health::{HealthBuilder, HealthIndicator, HealthStatus};
pub use layers::{default_cors, default_trace, init_tracing};
pub use lifecycle::LifecycleController;
pub use plugin::Plugin;
pub use plugins::{AdvancedHealth, Cors, ErrorHandling, Health, NormalizePath, Tracing};
pub use request_id::{RequestId, RequestIdPlugin};
pub use state::NvState;

pub use schemars;
