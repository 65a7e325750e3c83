mod config;
mod db;
mod error;
mod mqtt;
mod payload;
mod topic;

use crate::config::Config;
use crate::db::EventStore;
use anyhow::Result;
use tokio::sync::watch;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,databridge=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing()?;

    let store = EventStore::connect(&config.database_url(), config.db_pool_size).await?;
    tracing::info!(
        host = %config.db_host,
        database = %config.db_database,
        pool_size = config.db_pool_size,
        "event store pool opened"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut bridge_handle = {
        let config = config.clone();
        let store = store.clone();
        tokio::spawn(async move { mqtt::run_bridge(config, store, shutdown_rx).await })
    };

    tokio::select! {
        res = &mut bridge_handle => {
            // Fatal path: no pool drain, the supervisor restarts the process.
            return match res {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => {
                    tracing::error!(error = %err, "bridge exited");
                    Err(err.into())
                }
                Err(err) => {
                    tracing::error!(error = %err, "bridge task panicked");
                    Err(err.into())
                }
            };
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    }

    match bridge_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return Err(err.into()),
        Err(err) => return Err(err.into()),
    }

    store.close().await;
    tracing::info!("event store pool closed");
    Ok(())
}
