use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use pokedex_bff::{config::Config, db, routes, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    std::env::set_var(
        "RUST_LOG",
        std::env::var("RUST_LOG").unwrap_or_else(|_| String::from("info")),
    );

    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let pool = db::connect(&config.database_url, config.database_max_connections).await?;
    let state = AppState::new(&config, pool)?;

    // Expired entries are also dropped on read; the sweeper only reclaims memory.
    let _sweeper = state.pokemon.cache().spawn_sweeper(config.cache.check_period);

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
    let app = routes::router(state)
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer);

    info!("listening on {}", config.bind_addr);
    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
