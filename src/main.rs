//! allowsync - IP allow-list reconciler for cloud storage firewalls

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use allowsync::cli::{Cli, Commands};
use allowsync::commands::{self, load_config, sync::SyncOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = || load_config(&cli.config, cli.account.clone(), cli.resource_group.clone());

    // Execute command
    match cli.command {
        Commands::Sync {
            ref source,
            mode,
            no_backup,
            ref backup_dir,
            dry_run,
        } => {
            let options = SyncOptions {
                mode,
                no_backup,
                backup_dir: backup_dir.clone(),
                dry_run,
            };
            commands::sync::run(source.clone(), options, &config()?).await
        }
        Commands::List => commands::list::run(&config()?).await,
        Commands::Wipe { yes, no_backup } => commands::wipe::run(yes, no_backup, &config()?).await,
        Commands::Access { ref action } => commands::access::run(action.clone(), &config()?).await,
        Commands::Detect => commands::detect::run(&config()?).await,
        Commands::Validate { ref file } => commands::validate::run(file).await,
        Commands::Resolve { ptr } => commands::resolve::run(ptr, &config()?).await,
        Commands::Flag { ref action } => commands::flag::run(action.clone(), &cli.config).await,
        Commands::Version => {
            println!("allowsync {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
