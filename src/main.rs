use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use roadside_dispatch::{
    config::{DatabaseConfig, EnvironmentConfig},
    controllers::auth_controller::bootstrap_admin,
    create_app, database,
    repositories::{DispatchStore, MemoryDispatchStore, PgDispatchStore},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging (RUST_LOG, por defecto info)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚨 Roadside Dispatch API");
    info!("========================");

    let config = EnvironmentConfig::from_env()?;

    let store: Arc<dyn DispatchStore> = match DatabaseConfig::from_environment(&config) {
        Some(db_config) => {
            let pool = database::create_pool(&db_config).await?;
            database::run_migrations(&pool).await?;
            Arc::new(PgDispatchStore::new(pool))
        }
        None => {
            warn!("⚠️ DATABASE_URL no definido: usando store en memoria (los datos no persisten)");
            Arc::new(MemoryDispatchStore::new())
        }
    };

    bootstrap_admin(&store, &config).await?;

    let app_state = AppState::new(config.clone(), store);
    spawn_token_cleanup(app_state.clone());

    let app = create_app(app_state);
    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{} ({})", addr, config.environment);
    info!("🔍 Endpoints bajo /api: users/, providers/, requests/");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Purga periódica de sesiones revocadas que ya expiraron
fn spawn_token_cleanup(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            let removed = state.cleanup_expired_tokens().await;
            if removed > 0 {
                info!("🧹 {} sesiones revocadas purgadas", removed);
            }
        }
    });
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
