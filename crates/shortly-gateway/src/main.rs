use clap::Parser;
use shortly_gateway::app::App;
use shortly_gateway::cli::Cli;
use shortly_gateway::services::Services;
use shortly_gateway::telemetry;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_format)?;

    let services = Services::build(&cli).await?;

    let listener = tokio::net::TcpListener::bind(cli.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "starting gateway server");

    services.worker.start()?;

    axum::serve(listener, App::router(services.app_state()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    if let Err(e) = services.worker.stop().await {
        error!(error = %e, "failed to stop access sync worker");
    }
    services.side_effects.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
    }
}
