pub mod error_code;
pub mod events;
pub mod export;
pub mod health;
pub mod helpers;
pub mod redirect;
pub mod routes;
pub mod stats;
pub mod types;

pub use error_code::ErrorCode;
pub use health::{HealthService, health_routes};
pub use redirect::redirect_routes;
pub use routes::{api_v1_routes, events_routes, stats_routes};
pub use types::{ApiResponse, HealthResponse, StatsQuery};
