//! eureka-exporter - version 0.1.0
//!
//! Prometheus exporter for Eureka registries with tracing logging.
//! This is the main entry point that initializes the server and handles subcommands.

mod cli;
mod commands;
mod handlers;
mod state;

use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use eureka_exporter::config::{validate_effective_config, Config, DEFAULT_BIND_ADDR, DEFAULT_PORT};
use eureka_exporter::{
    ConfigReloader, EurekaClient, ExporterMetrics, HealthStats, InstanceStatusGauge, LabelSchema,
    MonitorContext, Supervisor,
};
use prometheus::{Gauge, Registry};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::{net::TcpListener, signal};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn};

use cli::{resolve_config, show_config, Args, Commands, LogLevel};
use commands::{command_config, command_test};
use handlers::{config_handler, health_handler, metrics_handler, root_handler};
use state::AppState;

/// Initializes tracing logging subsystem with configured log level.
///
/// `--log-level` wins over `log_level` from the config file.
fn setup_logging(config: &Config, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = match &args.log_level {
        Some(LogLevel::Off) => LevelFilter::OFF,
        Some(LogLevel::Error) => LevelFilter::ERROR,
        Some(LogLevel::Warn) => LevelFilter::WARN,
        Some(LogLevel::Info) => LevelFilter::INFO,
        Some(LogLevel::Debug) => LevelFilter::DEBUG,
        Some(LogLevel::Trace) => LevelFilter::TRACE,
        None => config
            .log_level
            .as_deref()
            .and_then(|l| l.parse().ok())
            .unwrap_or(LevelFilter::INFO),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Logging initialized with level: {}", log_level);
    Ok(())
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if loading or validation fails.
fn load_validated_config(args: &Args) -> (Config, std::path::PathBuf) {
    let (config, path) = match resolve_config(args) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    (config, path)
}

/// Resolves once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Generating a config file must work without one.
    if let Some(Commands::Config {
        output,
        format,
        commented,
    }) = &args.command
    {
        return command_config(output.clone(), format.clone(), *commented);
    }

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let (config, _) = load_validated_config(&args);

        if args.check_config {
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    let (config, config_path) = load_validated_config(&args);

    if let Some(Commands::Test { verbose }) = &args.command {
        return command_test(*verbose, &config).await;
    }

    setup_logging(&config, &args)?;

    info!("Starting eureka-exporter");

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);

    // Initialize Prometheus metrics registry
    let registry = Registry::new();
    debug!("Prometheus registry initialized");

    let schema = LabelSchema::new(&config.metadata);
    info!("eureka_app_status labels: {}", schema.label_names().join(", "));
    let status_gauge = InstanceStatusGauge::new(&schema, &registry)?;
    let telemetry = ExporterMetrics::new(&registry)?;
    let scrape_duration = Gauge::new(
        "eureka_exporter_scrape_duration_seconds",
        "Time spent serving /metrics request",
    )?;
    registry.register(Box::new(scrape_duration.clone()))?;

    debug!("All metrics registered successfully");

    let health_stats = Arc::new(HealthStats::new());

    let ctx = MonitorContext::new(Arc::new(status_gauge), schema)
        .with_stats(health_stats.clone())
        .with_telemetry(telemetry.clone());
    let client = EurekaClient::new(config.request_timeout())?;
    let supervisor = Arc::new(Supervisor::new(client, ctx));

    let targets = config.targets();
    info!("Polling {} registry targets", targets.len());
    supervisor.start(targets).await;

    if args.no_watch {
        info!("Config file watching disabled");
    } else {
        let reloader = ConfigReloader::new(config_path.clone(), supervisor.clone(), &config)
            .with_cli_port(args.port.is_some());
        tokio::spawn(async move {
            if let Err(e) = reloader.watch().await {
                warn!("Config file watcher stopped, live reload disabled: {}", e);
            }
        });
    }

    let state = Arc::new(AppState {
        registry,
        telemetry,
        scrape_duration,
        supervisor: supervisor.clone(),
        config: Arc::new(config.clone()),
        health_stats,
        start_time: Instant::now(),
    });

    // Configure HTTP server routes
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler));

    if config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }

    app = app.route("/config", get(config_handler));

    let app = app.with_state(state.clone());

    // Check if TLS is enabled
    let tls_paths = match (&config.tls_cert_path, &config.tls_key_path) {
        (Some(cert), Some(key)) if config.enable_tls.unwrap_or(false) => Some((cert, key)),
        _ => None,
    };

    if let Some((cert_path, key_path)) = tls_paths {
        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .map_err(|e| {
                error!("Failed to load TLS configuration: {}", e);
                e
            })?;

        info!("eureka-exporter listening on https://{}:{}", bind_ip_str, port);

        let server = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
            _ = shutdown_signal() => {
                info!("Shutdown signal received, exiting...");
            }
        }
    } else {
        // TLS is disabled - use standard TCP listener
        let listener = TcpListener::bind(addr).await?;
        info!("eureka-exporter listening on http://{}:{}", bind_ip_str, port);

        let server = axum::serve(listener, app);

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
            _ = shutdown_signal() => {
                info!("Shutdown signal received, exiting...");
            }
        }
    }

    supervisor.shutdown().await;
    info!("eureka-exporter stopped gracefully");
    Ok(())
}
