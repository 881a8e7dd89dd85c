//! # mega CLI
//!
//! Entry point for the `mega` binary: read-only queries against the mega-dao
//! contracts and unsigned call payloads for a wallet to sign.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mega_core::logging;
use rust_decimal::Decimal;
use tracing::{error, info};

mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Query the mega-dao contracts and build unsigned contract calls.
#[derive(Parser)]
#[command(name = "mega", version, about)]
struct Cli {
    /// Network to use: mainnet or testnet (overrides the config file).
    #[arg(long, global = true, env = "MEGA_NETWORK")]
    network: Option<String>,

    /// Stacks API base URL (overrides the network default).
    #[arg(long, global = true, env = "MEGA_API_URL")]
    api_url: Option<String>,

    /// Path to config.toml (default: ~/.mega/config.toml).
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to ~/.mega/logs.
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Token metadata and governance parameters.
    Info,

    /// MEGA balance of an address.
    Balance {
        /// Stacks address to look up.
        who: String,
    },

    /// Build an unsigned MEGA transfer with its post-condition.
    Transfer {
        /// Human-readable amount (e.g. "5" or "1.25").
        #[arg(long)]
        amount: Decimal,

        /// Sending address.
        #[arg(long)]
        sender: String,

        /// Receiving address.
        #[arg(long)]
        recipient: String,

        /// Optional memo, at most 34 bytes.
        #[arg(long)]
        memo: Option<String>,
    },

    /// Recorded state of a proposal.
    Proposal {
        /// Proposal contract identifier (<address>.<name>).
        proposal: String,
    },

    /// Voting power of an address at a past block.
    VotingPower {
        /// Stacks address to look up.
        who: String,

        /// Block height to evaluate at.
        #[arg(long)]
        block_height: u128,
    },

    /// Build an unsigned vote-many call from a JSON file of votes.
    VoteMany {
        /// File holding `[{"for": true, "proposal": "...", "delegator": null}, ...]`.
        file: PathBuf,
    },

    /// Print the effective configuration.
    Config {
        /// Write it to the config path as well.
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _log_guard = if cli.log_file {
        match logging::init_logging() {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
    } else {
        if let Err(e) = logging::init_console_logging(logging::DEFAULT_FILTER) {
            eprintln!("Error: {e:#}");
        }
        None
    };
    info!("Starting mega v{VERSION}");

    let result = run(cli).await;

    if let Err(e) = result {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = commands::Settings {
        network: cli.network,
        api_url: cli.api_url,
        config_path: cli.config,
    };

    match cli.command {
        Commands::Info => commands::query::info(&settings).await,
        Commands::Balance { who } => commands::query::balance(&settings, &who).await,
        Commands::Transfer {
            amount,
            sender,
            recipient,
            memo,
        } => commands::transfer::run(&settings, amount, &sender, &recipient, memo.as_deref()).await,
        Commands::Proposal { proposal } => commands::query::proposal(&settings, &proposal).await,
        Commands::VotingPower { who, block_height } => {
            commands::query::voting_power(&settings, &who, block_height).await
        }
        Commands::VoteMany { file } => commands::vote::run(&settings, &file),
        Commands::Config { save } => commands::show_config(&settings, save),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transfer() {
        let cli = Cli::try_parse_from([
            "mega",
            "--network",
            "testnet",
            "transfer",
            "--amount",
            "1.25",
            "--sender",
            "SP143YHR805B8S834BWJTMZVFR1WP5FFC03WZE4BF",
            "--recipient",
            "SP20KK070RWJD7DJ8C8JVH1RKDMPVGP038MVVZVGW",
        ])
        .unwrap();
        assert_eq!(cli.network.as_deref(), Some("testnet"));
        match cli.command {
            Commands::Transfer { amount, memo, .. } => {
                assert_eq!(amount, Decimal::new(125, 2));
                assert!(memo.is_none());
            }
            _ => panic!("expected transfer"),
        }
    }

    #[test]
    fn parses_voting_power() {
        let cli = Cli::try_parse_from([
            "mega",
            "voting-power",
            "SP143YHR805B8S834BWJTMZVFR1WP5FFC03WZE4BF",
            "--block-height",
            "150000",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::VotingPower { block_height: 150_000, .. }
        ));
    }

    #[test]
    fn rejects_bad_amount() {
        assert!(Cli::try_parse_from([
            "mega", "transfer", "--amount", "lots", "--sender", "a", "--recipient", "b",
        ])
        .is_err());
    }
}
