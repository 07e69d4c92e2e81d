use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the artifact relay.
#[derive(Parser, Debug)]
#[clap(
    name = "artifact-relay",
    version,
    about = "Relays CI build artifacts to storage and links them on the pull request"
)]
pub struct Args {
    /// Path to configuration YAML file
    #[clap(short = 'c', long, default_value = "config.yml")]
    pub config: PathBuf,

    /// Override the configured listening port
    #[clap(short, long)]
    pub port: Option<u16>,

    /// Override the configured bind address
    #[clap(long)]
    pub bind: Option<String>,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Load and validate the configuration, then exit
    CheckConfig,

    /// Write an example configuration file
    InitConfig {
        /// Path to output configuration file
        #[clap(default_value = "config.example.yml")]
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["artifact-relay"]);
        assert_eq!(args.config, PathBuf::from("config.yml"));
        assert!(args.port.is_none());
        assert!(!args.verbose);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_overrides_and_subcommand() {
        let args = Args::parse_from([
            "artifact-relay",
            "--config",
            "/etc/relay.yml",
            "--port",
            "8080",
            "-v",
            "check-config",
        ]);
        assert_eq!(args.config, PathBuf::from("/etc/relay.yml"));
        assert_eq!(args.port, Some(8080));
        assert!(args.verbose);
        assert_eq!(args.command, Some(Commands::CheckConfig));
    }

    #[test]
    fn test_init_config_default_path() {
        let args = Args::parse_from(["artifact-relay", "init-config"]);
        assert_eq!(
            args.command,
            Some(Commands::InitConfig {
                path: PathBuf::from("config.example.yml")
            })
        );
    }
}
