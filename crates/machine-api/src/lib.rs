mod error;
mod machine_api;
mod routes;
mod server;

pub use error::{domain_error_to_status, ApiError, Surface};
pub use machine_api::MachineApi;
pub use routes::{router, MachineApiServices};
pub use server::{build_cors_layer, run_http_server, CorsConfig, HttpServerConfig};
