pub mod auth_controller;
pub mod provider_controller;
pub mod request_controller;
