//! GSM bridge daemon

use anyhow::Context;
use brivas_gsm_bridge::telemetry::{init_tracing, TelemetryConfig};
use brivas_gsm_bridge::{BridgeConfig, EngineMessage, MnccLink, VERSION};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

/// Environment variable naming the configuration file
const CONFIG_ENV: &str = "GSM_BRIDGE_CONFIG";

fn main() -> anyhow::Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_tracing(&telemetry)?;

    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => BridgeConfig::from_file(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        Err(_) => BridgeConfig::default(),
    };
    config.validate()?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?
        .block_on(serve(config))
}

async fn serve(config: BridgeConfig) -> anyhow::Result<()> {
    info!(version = VERSION, links = config.links.len(), "Starting GSM bridge");

    let (engine_tx, mut engine_rx) = mpsc::unbounded_channel::<EngineMessage>();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Command senders are kept so the links see an open engine
    let mut commands = Vec::with_capacity(config.links.len());
    let mut tasks = Vec::with_capacity(config.links.len());
    for link in config.links {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        commands.push(command_tx);
        let name = link.name.clone();
        let mncc = MnccLink::new(link, engine_tx.clone(), command_rx);
        let shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = mncc.run(shutdown).await {
                error!(link = %name, "MNCC link failed: {}", e);
            }
        }));
    }
    drop(engine_tx);

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("waiting for Ctrl-C")?;
                info!("Shutdown requested");
                break;
            }
            Some(msg) = engine_rx.recv() => {
                info!(call = %msg.call, endpoint = %msg.endpoint, event = ?msg.event, "Engine message");
            }
        }
    }

    let _ = shutdown_tx.send(true);
    for task in tasks {
        if let Err(e) = task.await {
            error!("Link task aborted: {}", e);
        }
    }
    drop(commands);
    info!("GSM bridge stopped");
    Ok(())
}
