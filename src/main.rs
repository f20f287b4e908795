use std::net::SocketAddr;
use std::sync::Arc;

use admissions_backend::{
    config::{get_config, init_config, LogFormat},
    database::{
        pool::{create_pool, run_migrations},
        ApplicationStore, MemoryApplicationStore, PgApplicationStore,
    },
    routes,
    services::{document_service::LocalMediaStore, notification_service::HttpMailer},
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_format);

    let store: Arc<dyn ApplicationStore> = if config.uses_memory_store() {
        tracing::warn!(
            "DATABASE_URL is memory://; data and queued emails will not survive a restart, \
             and schools and applicants have to be seeded before submissions are accepted"
        );
        Arc::new(MemoryApplicationStore::new())
    } else {
        let pool = create_pool(&config.database_url, config.database_max_connections).await?;
        run_migrations(&pool).await?;
        Arc::new(PgApplicationStore::new(pool))
    };

    let mailer = Arc::new(HttpMailer::new(config.mail.clone())?);
    let media = Arc::new(LocalMediaStore::new(
        config.uploads_dir.clone(),
        config.uploads_public_url.clone(),
    ));
    tokio::fs::create_dir_all(&config.uploads_dir).await?;

    let (app_state, worker) = AppState::new(store, mailer, media, config.jwt_secret.clone());
    tokio::spawn(worker.run());

    info!("Serving uploads from: {}", config.uploads_dir);
    let app = routes::router(app_state, &config.uploads_dir);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
