//! Command-line interface for fourfold.

use clap::{Parser, Subcommand};

/// Fourfold - Connect Four matchmaking server
#[derive(Parser, Debug)]
#[command(name = "fourfold")]
#[command(about = "Connect Four matchmaking server with a bot fallback", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the matchmaking server
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the database file (overrides config)
        #[arg(long, conflicts_with = "no_db")]
        db_path: Option<String>,

        /// Run without persistence
        #[arg(long)]
        no_db: bool,
    },

    /// Print the leaderboard from a database file
    Leaderboard {
        /// Path to the database file
        #[arg(long, default_value = "fourfold.db")]
        db_path: String,

        /// Number of rows to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_overrides_parse() {
        let cli = Cli::try_parse_from(["fourfold", "serve", "--port", "8080", "--no-db"])
            .expect("Valid arguments");
        match cli.command {
            Command::Serve {
                port, no_db, host, ..
            } => {
                assert_eq!(port, Some(8080));
                assert!(no_db);
                assert!(host.is_none());
            }
            other => panic!("Unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_db_path_conflicts_with_no_db() {
        let result =
            Cli::try_parse_from(["fourfold", "serve", "--db-path", "x.db", "--no-db"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_leaderboard_defaults() {
        let cli = Cli::try_parse_from(["fourfold", "leaderboard"]).expect("Valid arguments");
        match cli.command {
            Command::Leaderboard { db_path, limit } => {
                assert_eq!(db_path, "fourfold.db");
                assert_eq!(limit, 10);
            }
            other => panic!("Unexpected command {:?}", other),
        }
    }
}
