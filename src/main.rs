use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use temp_file_manager::{Config, DiskRegistry, TempFileManager};

#[derive(Parser)]
#[command(name = "temp-file-manager")]
#[command(version)]
#[command(about = "Temporary file management with age-based cleanup")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "temp-files.toml")]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clean up old temporary files
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("temp_file_manager={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = if std::path::Path::new(&cli.config).exists() {
        let config = Config::load_from_file(&cli.config)?;
        info!("Configuration loaded from: {}", cli.config);
        config
    } else {
        info!("No configuration file at {}, using defaults", cli.config);
        Config::default()
    };

    let disks = DiskRegistry::from_config(&config);
    let manager = TempFileManager::new(&config, &disks).await?;

    match cli.command {
        Command::Cleanup => {
            println!("Cleaning up old temporary files...");
            let removed = manager.cleanup_old_files().await;
            println!("Cleanup completed successfully! ({removed} files removed)");
        }
    }

    Ok(())
}
