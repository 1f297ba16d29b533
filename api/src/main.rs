use api::auth::middleware::log_request;
use api::routes::routes;
use api::services::absence::run_absence_sweep;
use axum::{Router, middleware::from_fn};
use db::connect;
use migration::Migrator;
use sea_orm_migration::MigratorTrait;
use std::{net::SocketAddr, time::Duration};
use tower_http::cors::CorsLayer;
use tracing_appender::rolling;
use util::{config, state::AppState};

#[tokio::main]
async fn main() {
    let _log_guard = init_logging(&config::log_file());

    let db = connect().await;
    Migrator::up(&db, None)
        .await
        .expect("Failed to apply migrations");

    let app_state = AppState::new(db);

    // Scheduled absence sweep, runs for the lifetime of the process.
    spawn_absence_sweeper(app_state.clone());

    let cors = CorsLayer::very_permissive();

    let app = Router::new()
        .nest("/api", routes(app_state.clone()))
        .layer(from_fn(log_request))
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", config::host(), config::port())
        .parse()
        .expect("Invalid address");

    println!(
        "Starting {} on http://{}:{}",
        config::project_name(),
        config::host(),
        config::port()
    );

    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server crashed");
}

fn init_logging(log_file: &str) -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let file_appender = rolling::daily("logs", log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(true);

    let env_filter =
        EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("api=info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if config::log_to_stdout() {
        registry.with(stdout_layer).init();
    } else {
        registry.init();
    }

    guard
}

/// Spawns the periodic scheduled sweep: every tick it notifies absentees for
/// recently ended sessions that have not been notified yet.
fn spawn_absence_sweeper(app_state: AppState) {
    let interval = Duration::from_secs(config::sweep_interval_seconds());
    let db = app_state.db_clone();

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            run_absence_sweep(db.clone(), None).await;
        }
    });
}
