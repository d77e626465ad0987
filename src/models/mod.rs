//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL.

pub mod provider;
pub mod service_request;
pub mod user;

pub use provider::{NewProvider, Provider, ProviderStatus};
pub use service_request::{
    AssignmentPhase, NewServiceRequest, Priority, RequestFilter, RequestStatus, ServiceRequest,
    ServiceType,
};
pub use user::{NewUser, User, UserProfileUpdate, UserResponse, UserRole};
