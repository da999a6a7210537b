pub mod handlers;
pub mod server;

pub use handlers::{AppState, HealthState, TargetStatus, TOKEN_HEADER};
pub use server::{build_router, run_server};
