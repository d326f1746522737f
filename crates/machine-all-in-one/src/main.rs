mod config;
mod telemetry;

use std::sync::Arc;

use config::ServiceConfig;
use machine_api::{MachineApi, MachineApiServices};
use machine_domain::{EnvelopeService, FolderRepository, RecordService};
use machine_envelope::{EnvelopeCodec, FixedIvAesCbcCodec};
use machine_postgres::{PostgresClient, PostgresFolderRepository};
use telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let telemetry_providers = match init_telemetry(&TelemetryConfig {
        service_name: config.otel_service_name.clone(),
        otel_endpoint: config.otel_endpoint.clone(),
        otel_enabled: config.otel_enabled,
        log_level: config.log_level.clone(),
    }) {
        Ok(providers) => providers,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        otel_enabled = config.otel_enabled,
        otel_endpoint = %config.otel_endpoint,
        "Starting machine-all-in-one service"
    );
    debug!("Configuration: {:?}", config);

    // Key material and credentials are validated before anything is served
    let envelope_key = match config.envelope_key() {
        Ok(key) => key,
        Err(e) => {
            error!("Invalid envelope key material: {}", e);
            std::process::exit(1);
        }
    };
    let credentials = match config.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("Invalid transport credentials: {}", e);
            std::process::exit(1);
        }
    };

    let repository: Arc<dyn FolderRepository> = match initialize_postgres(&config).await {
        Ok(client) => Arc::new(PostgresFolderRepository::new(client)),
        Err(e) => {
            error!("Failed to initialize PostgreSQL: {:#}", e);
            std::process::exit(1);
        }
    };

    let codec: Arc<dyn EnvelopeCodec> = Arc::new(FixedIvAesCbcCodec::new(envelope_key));
    let services = MachineApiServices {
        envelope_service: Arc::new(EnvelopeService::new(
            repository.clone(),
            codec,
            config.identity(),
            credentials,
        )),
        record_service: Arc::new(RecordService::new(repository)),
    };

    let machine_api = MachineApi::new(services, config.http_server_config());

    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown_token.clone()));

    let result = machine_api.run(shutdown_token).await;

    info!("Running cleanup tasks...");
    shutdown_telemetry(telemetry_providers);

    if let Err(e) = result {
        eprintln!("Machine API exited with error: {:#}", e);
        std::process::exit(1);
    }
}

async fn initialize_postgres(config: &ServiceConfig) -> anyhow::Result<PostgresClient> {
    info!("Initializing PostgreSQL...");
    let postgres_config = config.postgres_config();
    let client = PostgresClient::from_config(&postgres_config)?;
    client.ping().await?;

    if postgres_config.run_migrations {
        client.run_migrations().await?;
    }

    Ok(client)
}

/// Cancels the token on Ctrl+C or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    token.cancel();
}
