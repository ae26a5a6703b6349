mod cli;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::{Cli, Commands};
use ratstalker_channels::{adapter_from_config, render_server_list, ChannelDelivery};
use ratstalker_core::monitor::resolve_hosts;
use ratstalker_core::{
    CaptureParams, Config, ConfigValidator, GlobalSnapshot, MonitorLoop, MonitorSettings,
    ServerSummary, WatchList,
};
use ratstalker_query::UdpStatusQuery;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ratstalker=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    // Handle ConfigSample immediately without loading config
    if let Some(Commands::ConfigSample { output }) = &cli.command {
        let path = output
            .clone()
            .unwrap_or_else(|| PathBuf::from("./ratstalker.sample.yaml"));
        Config::sample()
            .save(&path)
            .with_context(|| format!("writing sample config to {}", path.display()))?;
        println!("Sample config written to {}", path.display());
        return Ok(());
    }

    let config = Config::load(&cli.config_path).context("loading config")?;
    ConfigValidator::validate(&config).context("validating config")?;

    match cli.command {
        None | Some(Commands::Run) => run(config).await,
        Some(Commands::Query { keywords }) => {
            let snapshot = capture_once(&config).await?;
            let found: Vec<ServerSummary> = snapshot
                .search(&keywords, config.query.show_empty)
                .into_iter()
                .map(ServerSummary::of)
                .collect();
            println!("{}", render_server_list(&found, !keywords.is_empty()).text);
            Ok(())
        }
        Some(Commands::Hunt { names }) => {
            let snapshot = capture_once(&config).await?;
            let found: Vec<ServerSummary> = snapshot
                .hunt(&names)
                .into_iter()
                .map(ServerSummary::of)
                .collect();
            println!("{}", render_server_list(&found, true).text);
            Ok(())
        }
        Some(Commands::ListServers) => {
            for host in &config.query.hosts {
                println!("  • {} ({})", host.label(), host.address_with_port());
            }
            Ok(())
        }
        Some(Commands::ConfigSample { .. }) => Ok(()),
    }
}

/// One capture against an empty previous snapshot, for on-demand lookups.
async fn capture_once(config: &Config) -> Result<GlobalSnapshot> {
    let hosts = resolve_hosts(config).await.context("resolving servers")?;
    let params = CaptureParams {
        hosts,
        timeout: config.query.timeout(),
        retries: config.query.retries,
    };
    let empty = GlobalSnapshot::empty(Utc::now());
    Ok(GlobalSnapshot::capture(&empty, &UdpStatusQuery::new(), &params, &config.rule_settings()).await)
}

async fn run(config: Config) -> Result<()> {
    let settings = MonitorSettings::from_config(&config)
        .await
        .context("resolving servers")?;

    let adapter = adapter_from_config(&config.delivery).context("setting up delivery")?;
    match adapter.health_check().await {
        Ok(true) => info!(platform = adapter.platform_name(), "Delivery ready"),
        Ok(false) => warn!(platform = adapter.platform_name(), "Delivery health check failed"),
        Err(e) => warn!(platform = adapter.platform_name(), error = %e, "Delivery unreachable"),
    }
    if settings.broadcast.is_empty() {
        warn!("No delivery rooms configured, server-wide notifications will be dropped");
    }

    let delivery = Arc::new(ChannelDelivery::new(adapter));
    let watchlist = Arc::new(WatchList::from_config(&config.watch));
    let (monitor, handle) = MonitorLoop::new(
        settings,
        Arc::new(UdpStatusQuery::new()),
        delivery,
        watchlist,
    );

    let task = tokio::spawn(monitor.run());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("Shutting down, waiting for the current cycle");
    handle.shutdown();

    let report = task.await.context("monitor task panicked")?;
    info!(
        cycles = report.cycles,
        notifications = report.notifications,
        delivery_failures = report.delivery_failures,
        "Bye"
    );
    Ok(())
}
