use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use convene_server::config::Config;
use convene_server::routes::create_routes;
use convene_server::state::AppState;

const DEFAULT_LOG_FILTER: &str = "convene_server=debug,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Successfully connected to database");

    sqlx::migrate!().run(&pool).await?;

    tracing::info!("Migrations run successfully");

    let addr = config.bind_addr();
    let app = create_routes(AppState::new(pool, config));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("🚀 Server running at http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
