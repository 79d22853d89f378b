use ferrotrade::config::{Config, LogFormat};
use ferrotrade::control_plane::ControlPlane;
use ferrotrade::logging;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    match config.log_format {
        LogFormat::Pretty => logging::init_logging(),
        LogFormat::Json => logging::init_json_logging(),
    }

    let control_plane = ControlPlane::bootstrap(config).await?;
    control_plane.start();
    info!("ferrotrade control plane running");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    control_plane.shutdown().await;
    Ok(())
}
