#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use std::path::PathBuf;

use clap::Parser;

/// A small line-oriented mail exchange server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the RON configuration file.
    ///
    /// Falls back to `PIGEON_CONFIG`, then ./pigeon.config.ron, then
    /// /etc/pigeon/pigeon.config.ron
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = pigeon::config::find_config_file(args.config)?;
    let pigeon = pigeon::config::load(&config_path)?;

    pigeon.run().await
}
