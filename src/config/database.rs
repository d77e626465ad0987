//! Configuración del pool de PostgreSQL

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::EnvironmentConfig;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl DatabaseConfig {
    /// `None` cuando no hay `DATABASE_URL`: la aplicación usa el store en memoria
    pub fn from_environment(config: &EnvironmentConfig) -> Option<Self> {
        let url = config.database_url.clone()?;
        let max_connections = config.database_max_connections.max(1);

        Some(Self {
            url,
            max_connections,
            min_connections: max_connections.min(2),
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(3600),
        })
    }

    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .connect(&self.url)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_url_means_no_database() {
        assert!(DatabaseConfig::from_environment(&EnvironmentConfig::default()).is_none());
    }

    #[test]
    fn test_pool_bounds_follow_max_connections() {
        let config = EnvironmentConfig {
            database_url: Some("postgresql://localhost/dispatch".to_string()),
            database_max_connections: 1,
            ..EnvironmentConfig::default()
        };
        let db = DatabaseConfig::from_environment(&config).unwrap();
        assert_eq!(db.max_connections, 1);
        assert_eq!(db.min_connections, 1);
    }
}
