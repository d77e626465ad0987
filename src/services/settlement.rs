//! Liquidación y agregados
//!
//! Vistas derivadas de las solicitudes completadas: tiempo medio de
//! respuesta para el panel de administración y ganancias por proveedor.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{RequestStatus, ServiceRequest};

/// Tiempo medio de respuesta en minutos enteros (redondeo half-up)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AverageResponse {
    pub minutes: Option<i64>,
}

impl AverageResponse {
    /// Media de `(completed_at - created_at)` sobre pares completos
    pub fn from_spans<I>(spans: I) -> Self
    where
        I: IntoIterator<Item = (DateTime<Utc>, DateTime<Utc>)>,
    {
        let (total_minutes, count) = spans
            .into_iter()
            .fold((0.0_f64, 0_u32), |(total, count), (created, completed)| {
                let minutes = (completed - created).num_milliseconds() as f64 / 60_000.0;
                (total + minutes, count + 1)
            });

        if count == 0 {
            return Self { minutes: None };
        }

        Self {
            minutes: Some(round_half_up(total_minutes / count as f64)),
        }
    }

    /// Sobre solicitudes completadas con ambos timestamps
    pub fn from_requests(requests: &[ServiceRequest]) -> Self {
        Self::from_spans(requests.iter().filter_map(|request| {
            match (request.status, request.completed_at) {
                (RequestStatus::Completed, Some(completed)) => Some((request.created_at, completed)),
                _ => None,
            }
        }))
    }

    /// `"N min"` por debajo de una hora, `"N hr"` redondeado si no; `"N/A"` sin datos
    pub fn display(&self) -> String {
        match self.minutes {
            None => "N/A".to_string(),
            Some(minutes) if minutes < 60 => format!("{} min", minutes),
            Some(minutes) => format!("{} hr", round_half_up(minutes as f64 / 60.0)),
        }
    }
}

impl std::fmt::Display for AverageResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// Suma de `final_cost` de las solicitudes completadas, con dos decimales
pub fn total_earnings(requests: &[ServiceRequest]) -> Decimal {
    let mut total = requests
        .iter()
        .filter(|request| request.status == RequestStatus::Completed)
        .filter_map(|request| request.final_cost)
        .fold(Decimal::ZERO, |acc, cost| acc + cost);
    total.rescale(2);
    total
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
