use std::net::SocketAddr;
use std::sync::Arc;

use blog_api::config::AppConfig;
use blog_api::{build_router, AppState};
use blog_shared::clients::db::create_pool;
use blog_shared::clients::email::EmailClient;
use blog_shared::clients::storage::ObjectStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    blog_shared::middleware::init_tracing("blog-api", config.is_production());

    let port = config.port;

    let db = create_pool(&config.database_url, config.db_pool_size)?;

    let storage = ObjectStorage::new(&config.storage_settings());
    storage.ensure_bucket().await;

    let email = EmailClient::new(
        &config.email_api_url,
        &config.resend_api_key,
        &config.from_email,
        &config.from_name,
    )?;

    let metrics_handle = blog_shared::middleware::init_metrics()?;

    tracing::info!(
        env = %config.env,
        otp_expiry_minutes = config.otp_expiry_minutes,
        trusted_proxy_hops = config.trusted_proxy_hops,
        origins = ?config.allowed_origins(),
        "configuration loaded"
    );

    let state = Arc::new(AppState::new(config, db, storage, email, metrics_handle));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "blog-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
