//! Routers por recurso, montados bajo `/api`

pub mod provider_routes;
pub mod request_routes;
pub mod user_routes;

pub use provider_routes::create_provider_router;
pub use request_routes::create_request_router;
pub use user_routes::create_user_router;
