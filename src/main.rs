use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use devspace_core::Config;

/// Workspace file service for the DevSpace browser editor
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Config file (default: <config_dir>/devspace/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Directory holding one workspace per user
    #[arg(long)]
    workspaces: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match cli.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env()?;

    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = &cli.workspaces {
        config.workspace.user_workspaces = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Initialize logging
    devspace_core::util::init_logging(&config.log);

    info!("Starting DevSpace Core on {}", config.bind_addr());

    devspace_core::server::run_server(config)
        .await
        .context("Server terminated with an error")
}
