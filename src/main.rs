use std::sync::Arc;

use anyhow::{Context, Result};

use price_forecast::api::{create_router, render_cli_output, AppState};
use price_forecast::config::Config;
use price_forecast::feature_source::CsvFeatureSource;
use price_forecast::forecast::{ForecastEngine, RangeReconciler};
use price_forecast::runtime::ModelRegistry;

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        config
            .logging
            .level
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_reconciler(config: &Config) -> Result<RangeReconciler<CsvFeatureSource>> {
    let instruments = config.models.preload_instruments()?;
    let registry = ModelRegistry::preload(
        &config.models.artifact_dir,
        &instruments,
        config.forecast.window,
    );
    Ok(RangeReconciler::new(
        Arc::new(registry),
        CsvFeatureSource::new(config.data.clone()),
        ForecastEngine::new(config.forecast.window, config.forecast.template),
    ))
}

/// `<CODE> <START> <END>`: run one forecast and print it as JSON.
fn run_once(reconciler: &RangeReconciler<CsvFeatureSource>, args: &[String]) -> Result<()> {
    let result = reconciler.reconcile_fields(&args[0], &args[1], &args[2]);
    println!("{}", render_cli_output(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Set PF_CONFIG_PATH or create config/default.toml");
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();

    // Registry loading is blocking file IO; finish it before serving anything.
    let cfg = config.clone();
    let reconciler = tokio::task::spawn_blocking(move || build_reconciler(&cfg))
        .await
        .context("model preload task panicked")??;

    if args.len() >= 3 {
        return run_once(&reconciler, &args);
    }

    tracing::info!(
        bind = %config.server.bind,
        models = reconciler.registry().len(),
        window = config.forecast.window,
        "Starting price-forecast server"
    );
    let state = Arc::new(AppState::new(reconciler, config.server.max_horizon_days));
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("server error")?;
    Ok(())
}
