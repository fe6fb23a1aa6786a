//! Links legacy sites to user accounts and backfills the `user` field on
//! site content. Safe to run repeatedly.

use clap::Parser;
use portfolio_cms_backend::{
    db::{self, DbConfig},
    logging,
    migration::{self, MigrationOptions},
};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "migrate", about = "Link sites to users and backfill content ownership")]
struct Cli {
    #[arg(long, env = "MONGODB_URI", hide_env_values = true)]
    mongodb_uri: String,

    #[arg(long, env = "MONGODB_DB", default_value = "portfolio_cms")]
    database: String,

    #[arg(long, env = "ADMIN_EMAIL", default_value = "admin@example.com")]
    admin_email: String,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: String,

    #[arg(long, env = "ADMIN_NAME", default_value = "Administrator")]
    admin_name: String,

    /// Report what would change without writing anything
    #[arg(long)]
    dry_run: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    let config = DbConfig {
        uri: cli.mongodb_uri,
        database: cli.database,
        max_pool_size: 4,
        server_selection_timeout_secs: 10,
        app_name: "portfolio-cms-migrate".to_string(),
    };

    let store = match db::connect(&config).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", db::redact_uri(&config.uri), e);
            return ExitCode::FAILURE;
        }
    };

    // Building indexes writes to the database, so a dry run leaves them alone
    if !cli.dry_run {
        db::prepare_indexes(store.as_ref()).await;
    }

    let options = MigrationOptions {
        admin_email: cli.admin_email,
        admin_password: cli.admin_password,
        admin_name: cli.admin_name,
        dry_run: cli.dry_run,
    };

    match migration::run(store.as_ref(), &options).await {
        Ok(report) => {
            if options.dry_run {
                eprintln!("Dry run: no documents were written.");
            } else if report.is_noop() {
                eprintln!("Nothing to migrate.");
            }
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Could not render report: {}", e),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Migration failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
