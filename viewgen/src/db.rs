use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{ConnectOptions, MySqlConnection};
use tracing::{info, warn};

use crate::config::HeatWaveConfig;

/// Opens the single connection used for one agent invocation and turns on
/// session-level HeatWave offload. The agent still works unaccelerated,
/// so a failed SET SESSION is only a warning.
pub async fn connect(config: &HeatWaveConfig) -> Result<MySqlConnection> {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
        .charset("utf8mb4");

    let mut conn = tokio::time::timeout(
        Duration::from_secs(config.connection_timeout),
        options.connect(),
    )
    .await
    .context("HeatWave connection attempt timed out")?
    .context("Failed to connect to MySQL HeatWave")?;

    let mut engine_enabled = true;
    for statement in [
        "SET SESSION use_secondary_engine = ON",
        "SET SESSION secondary_engine_cost_threshold = 100000",
    ] {
        if let Err(e) = sqlx::query(statement).execute(&mut conn).await {
            warn!("Could not enable HeatWave engine: {e}");
            engine_enabled = false;
            break;
        }
    }
    if engine_enabled {
        info!("HeatWave secondary engine enabled for view generation");
    }

    Ok(conn)
}
