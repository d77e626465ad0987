//! Cliente HTTP de la API de despacho
//!
//! La sesión es un valor explícito: `login` devuelve un [`Session`] y cada
//! llamada autenticada lo recibe. Un 401 es la única señal que invalida la
//! sesión ([`ClientError::SessionExpired`]); perder la carrera de asignación
//! llega como [`ClientError::AlreadyTaken`].

use std::ops::ControlFlow;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::dto::{
    AdminAssignRequest, CompleteRequestRequest, CreateProviderProfileRequest,
    CreateServiceRequestRequest, DispatchStatsResponse, LoginRequest, LoginResponse,
    ProviderStatsResponse, RegisterRequest, UpdateLocationRequest, UpdateStatusRequest,
};
use crate::models::{Provider, ProviderStatus, RequestStatus, ServiceRequest, UserResponse};

/// Intervalo de refresco de los dashboards
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Intervalo mínimo de polling; valores menores (incluido cero) se elevan a este
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("session expired or invalid")]
    SessionExpired,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("request already taken: {0}")]
    AlreadyTaken(String),

    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Credencial de una sesión iniciada
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    pub user: UserResponse,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Qué listado refresca [`DispatchClient::poll_requests`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTarget {
    MyRequests,
    MyAssignments,
    Pending,
    All,
}

pub struct DispatchClient {
    client: Client,
    base_url: String,
}

impl DispatchClient {
    /// `base_url` incluye el prefijo `/api`, p. ej. `http://localhost:8000/api`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str, session: Option<&Session>) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json");
        match session {
            Some(session) => builder.bearer_auth(&session.token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
        let response = check_status(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_list<T: DeserializeOwned>(builder: RequestBuilder) -> Result<Vec<T>, ClientError> {
        let response = check_status(builder.send().await?).await?;
        normalize_list(response.json().await?)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        session: &Session,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let builder = self.request(Method::POST, path, Some(session));
        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };
        Self::send(builder).await
    }

    // Usuarios y sesión

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserResponse, ClientError> {
        Self::send(self.request(Method::POST, "/users/register/", None).json(request)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse =
            Self::send(self.request(Method::POST, "/users/login/", None).json(&body))
                .await
                .map_err(|e| match e {
                    ClientError::SessionExpired => ClientError::InvalidCredentials,
                    other => other,
                })?;

        Ok(Session {
            token: response.token,
            user: response.user,
            expires_at: response.expires_at,
        })
    }

    /// Cierra la sesión en el servidor; el valor queda consumido
    pub async fn logout(&self, session: Session) -> Result<(), ClientError> {
        let _: Value = self.post::<(), _>("/users/logout/", &session, None).await?;
        Ok(())
    }

    pub async fn me(&self, session: &Session) -> Result<UserResponse, ClientError> {
        Self::send(self.request(Method::GET, "/users/me/", Some(session))).await
    }

    // Proveedores

    pub async fn providers(&self, session: &Session) -> Result<Vec<Provider>, ClientError> {
        Self::send_list(self.request(Method::GET, "/providers/", Some(session))).await
    }

    pub async fn my_profile(&self, session: &Session) -> Result<Provider, ClientError> {
        Self::send(self.request(Method::GET, "/providers/my_profile/", Some(session))).await
    }

    pub async fn my_stats(&self, session: &Session) -> Result<ProviderStatsResponse, ClientError> {
        Self::send(self.request(Method::GET, "/providers/my_stats/", Some(session))).await
    }

    pub async fn create_profile(
        &self,
        session: &Session,
        request: &CreateProviderProfileRequest,
    ) -> Result<Provider, ClientError> {
        self.post("/providers/create_profile/", session, Some(request))
            .await
    }

    pub async fn update_location(
        &self,
        session: &Session,
        latitude: f64,
        longitude: f64,
    ) -> Result<Provider, ClientError> {
        let body = UpdateLocationRequest { latitude, longitude };
        Self::send(
            self.request(Method::PUT, "/providers/update_location/", Some(session))
                .json(&body),
        )
        .await
    }

    pub async fn update_status(
        &self,
        session: &Session,
        status: ProviderStatus,
    ) -> Result<Provider, ClientError> {
        let body = UpdateStatusRequest { status };
        Self::send(
            self.request(Method::PUT, "/providers/update_status/", Some(session))
                .json(&body),
        )
        .await
    }

    // Solicitudes

    pub async fn create_request(
        &self,
        session: &Session,
        request: &CreateServiceRequestRequest,
    ) -> Result<ServiceRequest, ClientError> {
        self.post("/requests/", session, Some(request)).await
    }

    pub async fn list_requests(
        &self,
        session: &Session,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ServiceRequest>, ClientError> {
        let mut builder = self.request(Method::GET, "/requests/", Some(session));
        if let Some(status) = status {
            builder = builder.query(&[("status", status.as_str())]);
        }
        Self::send_list(builder).await
    }

    pub async fn my_requests(&self, session: &Session) -> Result<Vec<ServiceRequest>, ClientError> {
        Self::send_list(self.request(Method::GET, "/requests/my_requests/", Some(session))).await
    }

    pub async fn my_assignments(
        &self,
        session: &Session,
    ) -> Result<Vec<ServiceRequest>, ClientError> {
        Self::send_list(self.request(Method::GET, "/requests/my_assignments/", Some(session)))
            .await
    }

    pub async fn get_request(&self, session: &Session, id: i64) -> Result<ServiceRequest, ClientError> {
        Self::send(self.request(Method::GET, &format!("/requests/{}/", id), Some(session))).await
    }

    pub async fn accept(&self, session: &Session, id: i64) -> Result<ServiceRequest, ClientError> {
        self.post::<(), _>(&format!("/requests/{}/assign/", id), session, None)
            .await
    }

    pub async fn admin_assign(
        &self,
        session: &Session,
        id: i64,
        provider_id: i64,
    ) -> Result<ServiceRequest, ClientError> {
        let body = AdminAssignRequest { provider_id };
        self.post(&format!("/requests/{}/admin_assign/", id), session, Some(&body))
            .await
    }

    pub async fn start(&self, session: &Session, id: i64) -> Result<ServiceRequest, ClientError> {
        self.post::<(), _>(&format!("/requests/{}/start/", id), session, None)
            .await
    }

    pub async fn complete(
        &self,
        session: &Session,
        id: i64,
        final_cost: Decimal,
    ) -> Result<ServiceRequest, ClientError> {
        let body = CompleteRequestRequest {
            final_cost: Some(final_cost),
        };
        self.post(&format!("/requests/{}/complete/", id), session, Some(&body))
            .await
    }

    pub async fn cancel(&self, session: &Session, id: i64) -> Result<ServiceRequest, ClientError> {
        self.post::<(), _>(&format!("/requests/{}/cancel/", id), session, None)
            .await
    }

    pub async fn stats(&self, session: &Session) -> Result<DispatchStatsResponse, ClientError> {
        Self::send(self.request(Method::GET, "/requests/stats/", Some(session))).await
    }

    async fn fetch(
        &self,
        session: &Session,
        target: PollTarget,
    ) -> Result<Vec<ServiceRequest>, ClientError> {
        match target {
            PollTarget::MyRequests => self.my_requests(session).await,
            PollTarget::MyAssignments => self.my_assignments(session).await,
            PollTarget::Pending => self.list_requests(session, Some(RequestStatus::Pending)).await,
            PollTarget::All => self.list_requests(session, None).await,
        }
    }

    /// Refrescar `target` cada `every` y entregar cada snapshot completo.
    ///
    /// Termina cuando el callback devuelve `Break` o cuando la sesión
    /// expira; otros errores se registran y el polling continúa. `every`
    /// nunca baja de [`MIN_POLL_INTERVAL`].
    pub async fn poll_requests<F>(
        &self,
        session: &Session,
        target: PollTarget,
        every: Duration,
        mut on_snapshot: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(Vec<ServiceRequest>) -> ControlFlow<()>,
    {
        let mut interval = tokio::time::interval(every.max(MIN_POLL_INTERVAL));
        loop {
            interval.tick().await;
            match self.fetch(session, target).await {
                Ok(snapshot) => {
                    if on_snapshot(snapshot).is_break() {
                        return Ok(());
                    }
                }
                Err(ClientError::SessionExpired) => return Err(ClientError::SessionExpired),
                Err(e) => warn!("⚠️ Refresco fallido ({:?}): {}", target, e),
            }
        }
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::SessionExpired);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let code = body["code"].as_str().unwrap_or_default().to_string();
    let message = body["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string());

    if status == StatusCode::CONFLICT && code == "ALREADY_ASSIGNED" {
        return Err(ClientError::AlreadyTaken(message));
    }
    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

/// Aceptar lista desnuda o envelope paginado (`results` o `data`)
pub fn normalize_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ClientError> {
    let items = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match (map.remove("results"), map.remove("data")) {
            (Some(items @ Value::Array(_)), _) | (_, Some(items @ Value::Array(_))) => items,
            _ => return Err(ClientError::Decode("object without a list field".to_string())),
        },
        other => return Err(ClientError::Decode(format!("expected a list, got {}", other))),
    };
    serde_json::from_value(items).map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_bare_list() {
        let items: Vec<i64> = normalize_list(json!([1, 2])).unwrap();
        assert_eq!(items, vec![1, 2]);
    }

    #[test]
    fn test_normalize_envelopes() {
        let results: Vec<i64> =
            normalize_list(json!({"count": 1, "page": 1, "page_size": 20, "results": [7]})).unwrap();
        assert_eq!(results, vec![7]);

        let data: Vec<i64> = normalize_list(json!({"success": true, "data": [3]})).unwrap();
        assert_eq!(data, vec![3]);
    }

    #[test]
    fn test_normalize_empty_is_ok() {
        let items: Vec<i64> = normalize_list(json!({"results": []})).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_normalize_rejects_non_lists() {
        assert!(normalize_list::<i64>(json!({"detail": "x"})).is_err());
        assert!(normalize_list::<i64>(json!("nope")).is_err());
    }
}
