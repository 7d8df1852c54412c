use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{routing::get, Json};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info};

use roomlock_config::RoomLockConfig;
use roomlock_controller::LockController;
use roomlock_core::{Component, Identity, LockBus, RoomLockError};
use roomlock_device::{feedback, DeviceSurface, XapiHttpSurface};
use roomlock_duo::{DuoClient, DuoSettings};

#[derive(Parser)]
#[command(name = "roomlock")]
#[command(about = "roomlock — second-factor push approval for a room endpoint")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the roomlock service
    Serve {
        /// Path to the YAML config file
        #[arg(short, long, default_value = "roomlock.yaml")]
        config: PathBuf,
    },
    /// Show current service status
    Status {
        /// Port the service is listening on
        #[arg(short, long, default_value_t = 8571)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            let config = roomlock_config::load_config(&config).await?;

            // Initialize structured logging
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| {
                            tracing_subscriber::EnvFilter::new(&config.logging.level)
                        }),
                )
                .json()
                .init();

            run_server(config).await?;
        }
        Commands::Status { port } => {
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{port}/api/health"))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("roomlock is not running on port {port}");
                }
            }
        }
    }

    Ok(())
}

async fn run_server(config: RoomLockConfig) -> Result<()> {
    info!(
        codec = %config.codec.base_url,
        duo_host = %config.duo.api_hostname,
        "Starting roomlock"
    );

    let surface = Arc::new(XapiHttpSurface::new(
        &config.codec.base_url,
        &config.codec.username,
        config.codec.password.expose(),
    ));

    // Resolve the authentication principal from the endpoint's bound
    // contact address before anything else; without it no request can be
    // signed.
    let identity = resolve_identity(surface.as_ref(), &config).await?;
    info!(identity = %identity, "Resolved authentication principal");

    let duo = Arc::new(DuoClient::new(DuoSettings {
        api_hostname: config.duo.api_hostname.clone(),
        integration_key: config.duo.integration_key.clone(),
        secret_key: config.duo.secret_key.expose().to_string(),
        preauth_timeout: Duration::from_secs(config.timeouts.preauth_secs),
        auth_timeout: Duration::from_secs(config.timeouts.auth_secs),
    }));

    let mut bus = LockBus::new();
    let controller_rx = bus
        .take_controller_rx()
        .context("controller receiver already taken")?;

    let controller = LockController::new(
        surface.clone(),
        duo,
        identity,
        bus.controller_tx.clone(),
    );
    tokio::spawn(async move {
        if let Err(err) = controller.start(controller_rx).await {
            error!(error = %err, "Lock controller exited");
        }
    });

    // Point the codec's feedback slots at our webhook.
    let callback = format!(
        "{}{}",
        config.webhook.callback_url.trim_end_matches('/'),
        config.webhook.path
    );
    surface.register_feedback(&callback).await?;

    let app = feedback::build_router(&config.webhook.path, bus.controller_tx.clone())
        .route("/api/health", get(health));

    let addr = format!("{}:{}", config.webhook.bind_address, config.webhook.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(bind = %addr, "Feedback webhook listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Read the endpoint's contact address, racing the configured startup
/// deadline: a codec that is still booting can hang this call.
async fn resolve_identity(
    surface: &XapiHttpSurface,
    config: &RoomLockConfig,
) -> Result<Identity> {
    let deadline = Duration::from_secs(config.timeouts.identity_fetch_secs);
    let contact = tokio::time::timeout(deadline, surface.contact_address())
        .await
        .map_err(|_| {
            RoomLockError::IdentityUnavailable("timed out reading contact info".to_string())
        })??;
    Ok(Identity::from_contact(&contact, &config.duo.domain))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "roomlock" }))
}
