use std::{io, process};

use anyhow::Result;
use clap::Parser;
use eksauth::{Cli, Commands};
use tracing_log::AsTrace;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
  let cli = Cli::parse();

  // Logs go to stderr; stdout belongs to the credential JSON kubectl reads
  let subscriber = FmtSubscriber::builder()
    .with_max_level(cli.verbose.log_level_filter().as_trace())
    .without_time()
    .with_ansi(!cli.no_color)
    .with_writer(io::stderr)
    .finish();
  tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

  match &cli.command {
    Commands::GetToken(token) => {
      if let Err(err) = token.get_token() {
        eprintln!("Error: {err:#}");
        process::exit(1);
      }
    }
  }

  Ok(())
}
