use std::{sync::Arc, time::Duration};

use clap::Parser;
use config_loader::Cli;
use engine::Engine;
use runtime::ProdRuntime;
use server::{build_router, AppState};
use tracing_subscriber::EnvFilter;

/// Maps the traditional level names (`LOGLEVEL`'s accepted values) onto
/// `tracing`'s own vocabulary, folding `warning`/`critical` onto
/// `warn`/`error`.
fn normalize_log_level(raw: &str) -> &'static str {
    match raw.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "critical" => "error",
        _ => "info",
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_new(normalize_log_level(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    tracing::info!(port = cli.port, config_file = ?cli.config_file, "starting stubsim");

    metrics::register()?;

    let (catalog, config_dir) = config_loader::load(&cli)?;
    let runtime = ProdRuntime::new();
    let engine = Engine::new(catalog.clone(), runtime.clone(), Some(config_dir));

    if let Some(default_plan) = catalog.default_plan.clone() {
        if cli.test_mode {
            tracing::info!(plan = %default_plan, "TESTMODE set, launching default plan at startup");
            if let Err(err) = engine.launch_plan(&default_plan).await {
                tracing::warn!(error = %err, "failed to auto-launch default plan");
            }
        }
    }

    let state = Arc::new(AppState { engine, config: catalog, api_username: cli.api_auth_username.clone(), api_password: cli.api_auth_password.clone() });

    let ticker_state = state.clone();
    let ticker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(200));
        loop {
            interval.tick().await;
            ticker_state.engine.tick().await;
        }
    });

    let app = build_router(state);
    let addr = format!("{}:{}", cli.api_listen_host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    ticker.abort();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received ctrl-c, shutting down");
}
