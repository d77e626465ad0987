//! DTOs de la API
//!
//! Cuerpos de entrada (validados con `validator`) y formas de salida que no
//! coinciden uno a uno con los modelos.

pub mod auth_dto;
pub mod common_dto;
pub mod provider_dto;
pub mod request_dto;

pub use auth_dto::*;
pub use common_dto::*;
pub use provider_dto::*;
pub use request_dto::*;
