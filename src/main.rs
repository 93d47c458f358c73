//! Outlook auth CLI binary entry point.

use clap::Parser;
use outlook_auth::auth::AuthService;
use outlook_auth::cli::{auth, Cli, Commands};
use outlook_auth::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // stdout is reserved for command output (and a stdio transport when embedded).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let service = AuthService::from_config(&config).await?;

    match cli.command {
        Commands::Accounts(args) => auth::handle_accounts(&service, args.command).await,
        Commands::Status => auth::handle_status(&service).await,
        Commands::Token(args) => auth::handle_token(&service, args).await,
        Commands::TestToken => auth::handle_test_token(&service).await,
        Commands::Logout => auth::handle_logout(&service).await,
    }
}
