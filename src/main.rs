use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::runtime::Runtime;

use artifact_relay::cli::{Args, Commands};
use artifact_relay::config::RelayConfig;
use artifact_relay::server::{self, AppState};

fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.verbose)?;

    if let Some(cmd) = &args.command {
        return handle_subcommand(cmd, &args);
    }

    let mut config = RelayConfig::load(&args.config)?;
    apply_overrides(&mut config, &args);
    let addr = listen_address(&config)?;

    let rt = Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(async move {
        let state = AppState::from_config(config)?;
        server::serve(state, addr).await
    })?;

    info!("Relay stopped");
    Ok(())
}

fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

/// Handle subcommands (check-config and init-config)
fn handle_subcommand(cmd: &Commands, args: &Args) -> Result<()> {
    match cmd {
        Commands::CheckConfig => {
            let config = RelayConfig::load(&args.config)?;
            println!("Configuration {} is valid", args.config.display());
            for (name, repo) in &config.repositories {
                let storages: Vec<_> = repo.storages.iter().map(|s| s.storage.as_str()).collect();
                println!(
                    "  {} -> [{}]{}",
                    name,
                    storages.join(", "),
                    if repo.gh_notify_secret.is_some() { "" } else { " (no notification secret)" }
                );
            }
            Ok(())
        }
        Commands::InitConfig { path } => {
            RelayConfig::example().save_to_yaml_file(path)?;
            println!("Created example configuration at {}", path.display());
            Ok(())
        }
    }
}

fn apply_overrides(config: &mut RelayConfig, args: &Args) {
    if let Some(port) = args.port {
        config.listening_port = port;
    }
    if let Some(bind) = &args.bind {
        config.bind_address = bind.clone();
    }
}

fn listen_address(config: &RelayConfig) -> Result<SocketAddr> {
    let ip: IpAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.bind_address))?;
    Ok(SocketAddr::new(ip, config.listening_port))
}
