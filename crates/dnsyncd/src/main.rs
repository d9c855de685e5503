// # dnsyncd - dynamic DNS sync daemon
//
// Thin integration layer: reads configuration from the environment, builds
// the Cloudflare provider and the HTTP IP source, and hands both to a
// `SyncClient`. All record logic lives in dnsync-core.
//
// ## Modes
//
// - `once`: sync every record and exit; any failed record is a runtime error
// - `cron`: sync on `DNSYNC_CRON` until SIGTERM/SIGINT
// - `ip-change`: sync at start and after every IP change until SIGTERM/SIGINT
//
// See `config.rs` for the environment variables.
//
// ## Example
//
// ```bash
// export DNSYNC_API_TOKEN=your_token
// export DNSYNC_RECORDS=home.example.com,home.example.com:AAAA
// export DNSYNC_MODE=cron
// export DNSYNC_CRON="*/5 * * * *"
//
// dnsyncd
// ```

mod config;

use anyhow::{Context, Result};
use config::{Config, Mode};
use dnsync_cloudflare::CloudflareProvider;
use dnsync_core::{BatchResult, SyncClient, SyncOptions};
use dnsync_ip_http::HttpIpSource;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Time allowed for an in-flight sync to finish after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error
#[derive(Debug, Clone, Copy)]
enum DnsyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error, including failed records in `once` mode
    RuntimeError = 2,
}

impl From<DnsyncExitCode> for ExitCode {
    fn from(code: DnsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DnsyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DnsyncExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnsyncExitCode::ConfigError.into();
    }

    info!("Starting dnsyncd");
    info!(
        "Configuration loaded: {} record(s), mode {:?}",
        config.sync.records.len(),
        config.mode
    );
    if config.dry_run {
        warn!("Dry-run enabled: no DNS record will be changed");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let client = match build_client(&config) {
            Ok(client) => client,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DnsyncExitCode::ConfigError;
            }
        };

        match run_daemon(client, config).await {
            Ok(()) => DnsyncExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DnsyncExitCode::RuntimeError
            }
        }
    });

    result.into()
}

fn build_client(config: &Config) -> Result<SyncClient> {
    let provider = CloudflareProvider::new(config.sync.credentials.clone())
        .context("Failed to create Cloudflare provider")?
        .with_dry_run(config.dry_run);
    let ip_source = HttpIpSource::new().context("Failed to create IP source")?;

    SyncClient::with_config(
        Arc::new(provider),
        Arc::new(ip_source),
        config.sync.engine.clone(),
    )
    .context("Failed to create sync client")
}

/// Run the configured mode until it completes or a shutdown signal arrives
async fn run_daemon(client: SyncClient, config: Config) -> Result<()> {
    let records = config.sync.records;
    let ip = config.sync.ip;

    for record in &records {
        info!("Managing record: {} ({})", record.name, record.effective_type());
    }

    match config.mode {
        Mode::Once => {
            let batch = client.sync_records_detailed(&records, ip.as_deref()).await?;
            log_batch(&batch);
            if !batch.is_success() {
                anyhow::bail!("{} of {} record(s) failed", batch.failed().count(), batch.len());
            }
            Ok(())
        }
        Mode::Cron => {
            let expression = config
                .sync
                .schedule
                .context("DNSYNC_CRON is required when DNSYNC_MODE=cron")?;
            let handle = client.sync_by_cron_time(&expression, records, options(ip))?;
            info!("Scheduled syncs on '{}'", handle.expression());

            let signal = wait_for_shutdown().await?;
            info!("Received shutdown signal: {}", signal);

            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle.stop()).await.is_err() {
                warn!("Scheduled sync did not stop within {:?}", SHUTDOWN_TIMEOUT);
            }
            Ok(())
        }
        Mode::IpChange => {
            let id = client.sync_on_ip_change(records, options(ip))?;
            info!("Watching for IP changes ({})", id);

            let signal = wait_for_shutdown().await?;
            info!("Received shutdown signal: {}", signal);

            if tokio::time::timeout(SHUTDOWN_TIMEOUT, client.stop_sync_on_ip_change(id))
                .await
                .is_err()
            {
                warn!("IP change listener did not stop within {:?}", SHUTDOWN_TIMEOUT);
            }
            Ok(())
        }
    }
}

fn options(ip: Option<String>) -> SyncOptions {
    let options = SyncOptions::default().on_result(|result| match result {
        Ok(batch) => log_batch(&batch),
        Err(e) => error!("Sync failed: {}", e),
    });

    match ip {
        Some(ip) => options.with_ip(ip),
        None => options,
    }
}

fn log_batch(batch: &BatchResult) {
    for record in batch.succeeded() {
        info!("{} {} -> {}", record.record_type, record.name, record.content);
    }
    for (name, e) in batch.failed() {
        error!("{}: {}", name, e);
    }
}

/// Wait for a shutdown signal (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for a shutdown signal (CTRL-C only)
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
