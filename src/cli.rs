use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ratstalker", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config_path: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Monitor the configured servers until Ctrl-C (default)
    Run,

    /// Query the servers once and print those matching any keyword
    Query {
        /// Matched against server name, map and game mode
        keywords: Vec<String>,
    },

    /// Find the servers a player is on
    Hunt {
        /// Player names (substring, case-insensitive)
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List the configured servers
    ListServers,

    /// Generate sample configuration
    ConfigSample {
        /// Output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::parse_from(["ratstalker"]);
        assert!(cli.command.is_none());
        assert!(cli.config_path.is_none());
    }

    #[test]
    fn test_global_config_path() {
        let cli = Cli::parse_from(["ratstalker", "hunt", "Anna", "-c", "rats.yaml"]);
        assert_eq!(cli.config_path.as_deref(), Some("rats.yaml"));
        match cli.command {
            Some(Commands::Hunt { names }) => assert_eq!(names, vec!["Anna"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_hunt_needs_a_name() {
        assert!(Cli::try_parse_from(["ratstalker", "hunt"]).is_err());
    }
}
