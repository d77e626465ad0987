//! Store en memoria
//!
//! Todas las tablas viven bajo un único `RwLock`; cada mutación toma el
//! lock de escritura, así que comprobar y escribir es un solo paso atómico.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::{ProviderRepository, RequestRepository, UserRepository};
use crate::models::{
    AssignmentPhase, NewProvider, NewServiceRequest, NewUser, Provider, ProviderStatus,
    RequestFilter, ServiceRequest, User, UserProfileUpdate,
};
use crate::services::{availability, lifecycle};
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    providers: BTreeMap<i64, Provider>,
    requests: BTreeMap<i64, ServiceRequest>,
    next_user_id: i64,
    next_provider_id: i64,
    next_request_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn provider_has_active_job(&self, provider_id: i64) -> bool {
        self.requests
            .values()
            .any(|r| r.provider_id == Some(provider_id) && r.status.is_bound_active())
    }

    fn request(&self, id: i64) -> AppResult<&ServiceRequest> {
        self.requests
            .get(&id)
            .ok_or_else(|| not_found_error("Request", id))
    }

    fn provider(&self, id: i64) -> AppResult<&Provider> {
        self.providers
            .get(&id)
            .ok_or_else(|| not_found_error("Provider", id))
    }
}

/// Store en memoria (desarrollo sin `DATABASE_URL` y tests)
#[derive(Default)]
pub struct MemoryDispatchStore {
    tables: RwLock<Tables>,
}

impl MemoryDispatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryDispatchStore {
    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == new_user.email) {
            return Err(conflict_error("User", "email", &new_user.email));
        }

        let id = Tables::next_id(&mut tables.next_user_id);
        let user = User {
            id,
            email: new_user.email,
            username: new_user.username,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            phone_number: new_user.phone_number,
            role: new_user.role,
            is_verified: new_user.is_verified,
            password_hash: new_user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().rev().cloned().collect())
    }

    async fn update_user_profile(&self, id: i64, changes: UserProfileUpdate) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| not_found_error("User", id))?;
        changes.apply_to(user);
        Ok(user.clone())
    }
}

#[async_trait]
impl ProviderRepository for MemoryDispatchStore {
    async fn create_provider(&self, user_id: i64, new_provider: NewProvider) -> AppResult<Provider> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(not_found_error("User", user_id));
        }
        if tables.providers.values().any(|p| p.user_id == user_id) {
            return Err(AppError::Conflict(
                "Provider profile already exists for this user".to_string(),
            ));
        }

        let now = Utc::now();
        let id = Tables::next_id(&mut tables.next_provider_id);
        let profile_completed = new_provider.is_complete();
        let provider = Provider {
            id,
            user_id,
            company_name: new_provider.company_name,
            license_number: new_provider.license_number,
            vehicle_type: new_provider.vehicle_type,
            vehicle_plate: new_provider.vehicle_plate,
            insurance_provider: new_provider.insurance_provider,
            insurance_policy_number: new_provider.insurance_policy_number,
            current_status: ProviderStatus::Offline,
            latitude: None,
            longitude: None,
            location_updated_at: None,
            profile_completed,
            created_at: now,
            updated_at: now,
        };
        tables.providers.insert(id, provider.clone());
        Ok(provider)
    }

    async fn find_provider_by_id(&self, id: i64) -> AppResult<Option<Provider>> {
        Ok(self.tables.read().await.providers.get(&id).cloned())
    }

    async fn find_provider_by_user(&self, user_id: i64) -> AppResult<Option<Provider>> {
        let tables = self.tables.read().await;
        Ok(tables.providers.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn list_providers(&self) -> AppResult<Vec<Provider>> {
        Ok(self.tables.read().await.providers.values().cloned().collect())
    }

    async fn update_location(
        &self,
        provider_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<Provider> {
        let mut tables = self.tables.write().await;
        let provider = tables
            .providers
            .get_mut(&provider_id)
            .ok_or_else(|| not_found_error("Provider", provider_id))?;

        availability::apply_location(provider, latitude, longitude, Utc::now()).map_err(|e| {
            let mut errors = validator::ValidationErrors::new();
            errors.add("location", e);
            AppError::Validation(errors)
        })?;
        Ok(provider.clone())
    }

    async fn update_status(&self, provider_id: i64, status: ProviderStatus) -> AppResult<Provider> {
        let mut tables = self.tables.write().await;
        let has_active_job = tables.provider_has_active_job(provider_id);
        let provider = tables
            .providers
            .get_mut(&provider_id)
            .ok_or_else(|| not_found_error("Provider", provider_id))?;

        availability::check_status_change(provider, status, has_active_job)?;
        provider.current_status = status;
        provider.updated_at = Utc::now();
        Ok(provider.clone())
    }

    async fn has_active_job(&self, provider_id: i64) -> AppResult<bool> {
        Ok(self.tables.read().await.provider_has_active_job(provider_id))
    }
}

#[async_trait]
impl RequestRepository for MemoryDispatchStore {
    async fn create_request(
        &self,
        requester_id: i64,
        new_request: NewServiceRequest,
    ) -> AppResult<ServiceRequest> {
        let mut tables = self.tables.write().await;
        let has_active = tables
            .requests
            .values()
            .any(|r| r.requester_id == requester_id && r.status.is_active());
        if has_active {
            return Err(AppError::Conflict(
                "Requester already has an active request".to_string(),
            ));
        }

        let id = Tables::next_id(&mut tables.next_request_id);
        let request = ServiceRequest::new_pending(id, requester_id, new_request, Utc::now());
        tables.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn find_request(&self, id: i64) -> AppResult<Option<ServiceRequest>> {
        Ok(self.tables.read().await.requests.get(&id).cloned())
    }

    async fn list_requests(&self, filter: &RequestFilter) -> AppResult<Vec<ServiceRequest>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<ServiceRequest> = tables
            .requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn assign_request(
        &self,
        request_id: i64,
        provider_id: i64,
        phase: AssignmentPhase,
    ) -> AppResult<ServiceRequest> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let mut request = tables.request(request_id)?.clone();
        let provider = tables.provider(provider_id)?;
        lifecycle::assign(&mut request, provider_id, phase, now)?;
        availability::ensure_eligible(provider, tables.provider_has_active_job(provider_id))?;

        if let Some(provider) = tables.providers.get_mut(&provider_id) {
            provider.current_status = availability::status_after_assignment();
            provider.updated_at = now;
        }
        tables.requests.insert(request_id, request.clone());
        Ok(request)
    }

    async fn start_request(&self, request_id: i64, provider_id: i64) -> AppResult<ServiceRequest> {
        let mut tables = self.tables.write().await;
        let mut request = tables.request(request_id)?.clone();

        lifecycle::start(&mut request, provider_id, Utc::now())?;
        tables.requests.insert(request_id, request.clone());
        Ok(request)
    }

    async fn complete_request(
        &self,
        request_id: i64,
        provider_id: i64,
        final_cost: Option<Decimal>,
    ) -> AppResult<ServiceRequest> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut request = tables.request(request_id)?.clone();

        lifecycle::complete(&mut request, provider_id, final_cost, now)?;
        tables.requests.insert(request_id, request.clone());

        let still_active = tables.provider_has_active_job(provider_id);
        if let Some(provider) = tables.providers.get_mut(&provider_id) {
            provider.current_status =
                availability::status_after_release(provider.current_status, still_active);
            provider.updated_at = now;
        }
        Ok(request)
    }

    async fn cancel_request(&self, request_id: i64, requester_id: i64) -> AppResult<ServiceRequest> {
        let mut tables = self.tables.write().await;
        let mut request = tables.request(request_id)?.clone();

        lifecycle::cancel(&mut request, requester_id, Utc::now())?;
        tables.requests.insert(request_id, request.clone());
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, RequestStatus, ServiceType, UserRole};
    use std::str::FromStr;
    use std::sync::Arc;

    fn new_user(email: &str, role: UserRole) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: email.split('@').next().unwrap_or(email).to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone_number: None,
            role,
            is_verified: false,
            password_hash: "hash".to_string(),
        }
    }

    fn new_request() -> NewServiceRequest {
        NewServiceRequest {
            service_type: ServiceType::Towing,
            priority: Priority::Medium,
            location_address: "123 Main St".to_string(),
            latitude: Some(40.7),
            longitude: Some(-74.0),
            vehicle_make: "Toyota".to_string(),
            vehicle_model: "Camry".to_string(),
            vehicle_year: None,
            vehicle_plate: None,
            description: String::new(),
        }
    }

    async fn online_provider(store: &MemoryDispatchStore, email: &str) -> Provider {
        let user = store.create_user(new_user(email, UserRole::Provider)).await.unwrap();
        let provider = store
            .create_provider(
                user.id,
                NewProvider {
                    company_name: "Ace".to_string(),
                    license_number: "L-1".to_string(),
                    vehicle_type: None,
                    vehicle_plate: "TOW 1".to_string(),
                    insurance_provider: None,
                    insurance_policy_number: None,
                },
            )
            .await
            .unwrap();
        store
            .update_status(provider.id, ProviderStatus::Online)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_assign_has_single_winner() {
        let store = Arc::new(MemoryDispatchStore::new());
        let requester = store.create_user(new_user("driver@example.com", UserRole::User)).await.unwrap();
        let request = store.create_request(requester.id, new_request()).await.unwrap();

        let mut providers = Vec::new();
        for i in 0..8 {
            providers.push(online_provider(&store, &format!("p{}@example.com", i)).await);
        }

        let handles: Vec<_> = providers
            .iter()
            .map(|p| {
                let store = store.clone();
                let provider_id = p.id;
                tokio::spawn(async move {
                    store
                        .assign_request(request.id, provider_id, AssignmentPhase::Accepted)
                        .await
                })
            })
            .collect();

        let mut winners = Vec::new();
        let mut losers = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(r) => winners.push(r.provider_id),
                Err(AppError::AlreadyAssigned(_)) => losers += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(losers, 7);
        let stored = store.find_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.provider_id, winners[0]);
        assert_eq!(stored.status, RequestStatus::Assigned);
    }

    #[tokio::test]
    async fn test_busy_provider_cannot_take_second_job() {
        let store = MemoryDispatchStore::new();
        let provider = online_provider(&store, "tow@example.com").await;
        let a = store.create_user(new_user("a@example.com", UserRole::User)).await.unwrap();
        let b = store.create_user(new_user("b@example.com", UserRole::User)).await.unwrap();
        let first = store.create_request(a.id, new_request()).await.unwrap();
        let second = store.create_request(b.id, new_request()).await.unwrap();

        store
            .assign_request(first.id, provider.id, AssignmentPhase::Accepted)
            .await
            .unwrap();
        let busy = store.find_provider_by_id(provider.id).await.unwrap().unwrap();
        assert_eq!(busy.current_status, ProviderStatus::Busy);

        // Volver a online con un trabajo activo se rechaza
        let err = store.update_status(provider.id, ProviderStatus::Online).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let err = store
            .assign_request(second.id, provider.id, AssignmentPhase::Dispatched)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProviderUnavailable(_)));
        let untouched = store.find_request(second.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_complete_releases_provider() {
        let store = MemoryDispatchStore::new();
        let provider = online_provider(&store, "tow@example.com").await;
        let user = store.create_user(new_user("u@example.com", UserRole::User)).await.unwrap();
        let request = store.create_request(user.id, new_request()).await.unwrap();

        store
            .assign_request(request.id, provider.id, AssignmentPhase::Accepted)
            .await
            .unwrap();
        let done = store
            .complete_request(request.id, provider.id, Some(Decimal::from_str("75").unwrap()))
            .await
            .unwrap();

        assert_eq!(done.final_cost.unwrap().to_string(), "75.00");
        let provider = store.find_provider_by_id(provider.id).await.unwrap().unwrap();
        assert_eq!(provider.current_status, ProviderStatus::Online);
        assert!(!store.has_active_job(provider.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_single_active_request_per_requester() {
        let store = MemoryDispatchStore::new();
        let user = store.create_user(new_user("u@example.com", UserRole::User)).await.unwrap();
        let first = store.create_request(user.id, new_request()).await.unwrap();

        let err = store.create_request(user.id, new_request()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        store.cancel_request(first.id, user.id).await.unwrap();
        assert!(store.create_request(user.id, new_request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_list_is_not_an_error() {
        let store = MemoryDispatchStore::new();
        let requests = store.list_requests(&RequestFilter::default()).await.unwrap();
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryDispatchStore::new();
        store.create_user(new_user("dup@example.com", UserRole::User)).await.unwrap();
        let err = store
            .create_user(new_user("dup@example.com", UserRole::Provider))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
