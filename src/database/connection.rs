//! Conexión a PostgreSQL
//!
//! Crea el pool a partir de [`DatabaseConfig`] y aplica las migraciones
//! embebidas en el binario.

use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::utils::errors::AppResult;

/// Crear el pool y verificar la conexión
pub async fn create_pool(config: &DatabaseConfig) -> AppResult<PgPool> {
    info!("🗄️ Conectando a {}", mask_database_url(&config.url));
    let pool = config.connect().await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(pool)
}

/// Ejecutar migraciones de la base de datos
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("✅ Migraciones aplicadas");
    Ok(())
}

/// Enmascarar credenciales de la URL para los logs
pub fn mask_database_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at_pos)) if at_pos > scheme_end => {
            format!("{}***:***@{}", &url[..scheme_end + 3], &url[at_pos + 1..])
        }
        _ => url.to_string(),
    }
}
