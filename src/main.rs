use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use preset_index::cli;

/// Build presets.json from the preset directories.
///
/// Annotation generation is configured through the environment:
/// API_KEY, BASE_URL, MODEL, and GITHUB_ACTIONS=true for unattended runs.
#[derive(Parser)]
#[command(name = "preset-index", version)]
#[command(about = "Generate the preset catalog index", long_about = None)]
struct Cli {
    /// Repository root containing the preset directories
    #[arg(default_value = ".")]
    path: String,

    /// Path to config file (defaults to ./preset-index.toml or ~/.config/preset-index/config.toml)
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    cli::build::run(cli.path, cli.config).await
}
