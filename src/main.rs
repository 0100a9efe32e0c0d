use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use bloom_backend::{
    config::Config,
    database::store::connect,
    middleware::cors::cors_layer,
    routes,
    services::email_service::mailer_from_config,
    AppState,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MAX_BODY_BYTES: usize = 1024 * 1024;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bloom_backend=info,tower_http=info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    let stores = connect(&config.store, config.admission_lock_timeout).await?;
    let mailer = mailer_from_config(&config.email)?;
    info!(
        store = config.store.backend_name(),
        voice = config.vapi.is_some(),
        status_webhook = config.status_webhook_url.is_some(),
        "configuration loaded"
    );

    let addr: SocketAddr = config.server_address.parse()?;
    let cors = cors_layer(config.cors_origin.as_deref());
    let app_state = AppState::new(config, stores, mailer)?;

    let app = routes::router(app_state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
