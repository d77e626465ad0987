//! Servicios de dominio
//!
//! Reglas puras del ciclo de vida, disponibilidad de proveedores y
//! liquidación. Sin I/O: los stores y controladores las orquestan.

pub mod availability;
pub mod lifecycle;
pub mod settlement;

pub use lifecycle::LifecycleError;
pub use settlement::{total_earnings, AverageResponse};
