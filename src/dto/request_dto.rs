use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{NewServiceRequest, Priority, ServiceType};
use crate::utils::errors::AppResult;
use crate::utils::validation::{normalize_plate, validate_coordinates, validate_not_empty, validate_plate};

// Alta de una solicitud de asistencia
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateServiceRequestRequest {
    pub service_type: ServiceType,

    #[serde(default)]
    pub priority: Priority,

    #[validate(length(max = 500), custom = "validate_not_empty")]
    pub location_address: String,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    #[validate(length(max = 100), custom = "validate_not_empty")]
    pub vehicle_make: String,

    #[validate(length(max = 100), custom = "validate_not_empty")]
    pub vehicle_model: String,

    #[validate(range(min = 1900, max = 2100))]
    pub vehicle_year: Option<i32>,

    #[validate(custom = "validate_plate")]
    pub vehicle_plate: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

impl CreateServiceRequestRequest {
    /// Validar campos y coordenadas (ambas o ninguna) y convertir
    pub fn into_new_request(self) -> AppResult<NewServiceRequest> {
        self.validate()?;

        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => validate_coordinates(lat, lng)
                .map_err(location_error)?,
            (None, None) => {}
            _ => {
                let mut error = ValidationError::new("coordinates");
                error.message = Some("latitude and longitude must be sent together".into());
                return Err(location_error(error));
            }
        }

        Ok(NewServiceRequest {
            service_type: self.service_type,
            priority: self.priority,
            location_address: self.location_address.trim().to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            vehicle_make: self.vehicle_make.trim().to_string(),
            vehicle_model: self.vehicle_model.trim().to_string(),
            vehicle_year: self.vehicle_year,
            vehicle_plate: self.vehicle_plate.as_deref().map(normalize_plate),
            description: self.description.unwrap_or_default().trim().to_string(),
        })
    }
}

fn location_error(error: ValidationError) -> crate::utils::errors::AppError {
    let mut errors = validator::ValidationErrors::new();
    errors.add("location", error);
    errors.into()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminAssignRequest {
    pub provider_id: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CompleteRequestRequest {
    pub final_cost: Option<Decimal>,
}

// Panel de administración
#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchStatsResponse {
    pub active_requests: usize,
    pub total_providers: usize,
    pub online_providers: usize,
    pub avg_response: String,
    pub avg_response_minutes: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(lat: Option<f64>, lng: Option<f64>) -> CreateServiceRequestRequest {
        CreateServiceRequestRequest {
            service_type: ServiceType::Towing,
            priority: Priority::default(),
            location_address: "123 Main St".to_string(),
            latitude: lat,
            longitude: lng,
            vehicle_make: "Toyota".to_string(),
            vehicle_model: "Camry".to_string(),
            vehicle_year: Some(2018),
            vehicle_plate: Some("abc 123".to_string()),
            description: None,
        }
    }

    #[test]
    fn test_converts_and_normalizes() {
        let new = body(Some(40.7), Some(-74.0)).into_new_request().unwrap();
        assert_eq!(new.vehicle_plate.as_deref(), Some("ABC 123"));
        assert_eq!(new.description, "");
        assert_eq!(new.priority, Priority::Medium);
    }

    #[test]
    fn test_half_coordinates_rejected() {
        assert!(body(Some(40.7), None).into_new_request().is_err());
        assert!(body(None, None).into_new_request().is_ok());
    }

    #[test]
    fn test_blank_address_rejected() {
        let mut request = body(None, None);
        request.location_address = "   ".to_string();
        assert!(request.into_new_request().is_err());
    }
}
