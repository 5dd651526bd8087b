use secretary_scheduler::{AppState, app, config::AppConfig, store::Store};
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .init();

    let state = AppState::new(Store::new(&config.db_path));
    let app = app(state, &config.static_dir);

    let addr = config.listen_addr;
    info!(%addr, db = %config.db_path.display(), "server starting");
    info!("static files: http://{addr}/");
    info!("API base:     http://{addr}/api");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
