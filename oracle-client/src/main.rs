//! CLI entrypoint: parses arguments, configures tracing, and drives the
//! C1-C7 pipeline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use oracle_client::{config::Config, pipeline};
use tracing::Level;

/// Oracle prover CLI.
#[derive(Debug, Parser)]
#[command(name = "oracle-client", about = "Generates and submits an oracle proof for a captured TLS session")]
struct Cli {
  /// Log verbosity: `error`, `warn`, `info`, `debug`, or `trace`.
  #[arg(long, default_value = "info")]
  log_level: String,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Runs the full pipeline: derive keys, locate the policy match, build
  /// the witness, prove, and submit to the verifier.
  Prove {
    /// Path to the JSON configuration file.
    #[arg(long)]
    config: PathBuf,
    /// Print the matched record's decrypted plaintext before proving.
    #[arg(long, default_value_t = false)]
    show_plaintext: bool,
  },
}

fn init_tracing(log_level: &str) -> anyhow::Result<()> {
  let level: Level = log_level.parse().map_err(|_| anyhow::anyhow!("invalid log level: {log_level}"))?;
  tracing_subscriber::fmt().with_max_level(level).with_line_number(true).init();
  Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  init_tracing(&cli.log_level)?;

  match cli.command {
    Command::Prove { config, show_plaintext } => {
      let config = Config::load(&config)?;
      let outcome = pipeline::run(&config, show_plaintext).await?;
      tracing::info!(
        record_id = %outcome.record_id,
        policy_satisfied = outcome.policy_satisfied,
        proof_bytes = outcome.proof_bytes.len(),
        "proof submitted"
      );
      if !outcome.policy_satisfied {
        anyhow::bail!("policy threshold was not satisfied by the located value");
      }
    }
  }

  Ok(())
}
