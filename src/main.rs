mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;

use manas_core::Config;
use manas_core::bootstrap::{
    create_provider, create_session, health_check, open_index, resolve_config_path,
    serve_sync,
};
use manas_gateway::GatewayServer;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    let mut config = Config::load(&config_path)?;
    if let Some(persona) = cli.persona {
        config.persona.name = persona;
    }
    config.validate()?;
    tracing::info!(config = %config_path.display(), "configuration loaded");

    let provider = Arc::new(create_provider(&config)?);
    health_check(&provider).await;

    match cli.command {
        Command::Ask { prompt } => {
            let index = open_index(&config, provider.as_ref(), true).await?;
            let session = create_session(&config, index, provider)?;
            let response = session.answer(&prompt).await?;
            println!("\n--- QUERY ---\n{prompt}");
            println!("\n--- FINAL RESPONSE ---\n{response}\n");
        }
        Command::Serve => {
            let index = open_index(&config, provider.as_ref(), serve_sync(&config)).await?;
            let session = Arc::new(create_session(&config, index, provider)?);

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("failed to listen for ctrl-c: {e:#}");
                    return;
                }
                tracing::info!("received shutdown signal");
                let _ = shutdown_tx.send(true);
            });

            GatewayServer::new(
                &config.gateway.bind,
                config.gateway.port,
                session,
                shutdown_rx,
            )
            .with_max_body_size(config.gateway.max_body_size)
            .serve()
            .await
            .context("gateway server failed")?;
        }
        Command::Index => {
            let index = open_index(&config, provider.as_ref(), true).await?;
            println!(
                "{} documents, {} passages in {}",
                index.document_count(),
                index.passage_count(),
                index.persist_dir().display()
            );
        }
    }

    Ok(())
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
