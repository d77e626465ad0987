use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{NewProvider, ProviderStatus};
use crate::utils::validation::{normalize_plate, validate_not_empty, validate_plate};

// Alta única del perfil de proveedor
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateProviderProfileRequest {
    #[validate(length(max = 255), custom = "validate_not_empty")]
    pub company_name: String,

    #[validate(length(max = 100), custom = "validate_not_empty")]
    pub license_number: String,

    #[validate(length(max = 100))]
    pub vehicle_type: Option<String>,

    #[validate(custom = "validate_plate")]
    pub vehicle_plate: String,

    #[validate(length(max = 255))]
    pub insurance_provider: Option<String>,

    #[validate(length(max = 100))]
    pub insurance_policy_number: Option<String>,
}

impl From<CreateProviderProfileRequest> for NewProvider {
    fn from(request: CreateProviderProfileRequest) -> Self {
        let optional = |value: Option<String>| {
            value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            company_name: request.company_name.trim().to_string(),
            license_number: request.license_number.trim().to_string(),
            vehicle_type: optional(request.vehicle_type),
            vehicle_plate: normalize_plate(&request.vehicle_plate),
            insurance_provider: optional(request.insurance_provider),
            insurance_policy_number: optional(request.insurance_policy_number),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ProviderStatus,
}

// Resumen de trabajo del proveedor autenticado
#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderStatsResponse {
    pub provider_id: i64,
    pub completed_jobs: usize,
    pub active_jobs: usize,
    pub total_earnings: Decimal,
}
