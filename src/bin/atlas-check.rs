//! Builds and checks MongoDB Atlas connection strings.
//!
//! `atlas-check encode` prints a correctly percent-encoded URI.
//! `atlas-check test` pings the cluster and, on success, stores the URI in
//! the env file.

use clap::{Args, Parser, Subcommand};
use portfolio_cms_backend::{
    atlas::{self, AtlasCredentials, FailureKind},
    db::redact_uri,
    logging,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

const PING_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Parser)]
#[command(name = "atlas-check", about = "MongoDB Atlas connection helper")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the encoded connection string
    Encode {
        #[command(flatten)]
        credentials: CredentialArgs,

        /// Print the password instead of masking it
        #[arg(long)]
        reveal: bool,
    },
    /// Ping the cluster and save the connection string on success
    Test {
        #[command(flatten)]
        credentials: CredentialArgs,

        #[arg(long, default_value = ".env")]
        env_file: PathBuf,

        /// Do not touch the env file
        #[arg(long)]
        no_write: bool,
    },
}

#[derive(Debug, Args)]
struct CredentialArgs {
    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    /// Cluster host, e.g. cluster0.abcde.mongodb.net
    #[arg(long)]
    cluster: Option<String>,

    #[arg(long)]
    database: Option<String>,
}

impl CredentialArgs {
    /// Fills in anything missing by prompting on the terminal.
    fn resolve<R: BufRead, W: Write>(
        self,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<AtlasCredentials> {
        let username = match self.username {
            Some(v) => v,
            None => atlas::prompt(input, output, "Database username", None)?,
        };
        let password = match self.password {
            Some(v) => v,
            None => atlas::prompt(input, output, "Database password", None)?,
        };
        let cluster_host = match self.cluster {
            Some(v) => v,
            None => atlas::prompt(input, output, "Cluster host", None)?,
        };
        let database = match self.database {
            Some(v) => v,
            None => atlas::prompt(input, output, "Database name", Some("portfolio_cms"))?,
        };

        Ok(AtlasCredentials {
            username,
            password,
            cluster_host,
            database: Some(database).filter(|d| !d.is_empty()),
        })
    }
}

fn read_credentials(args: CredentialArgs) -> Option<AtlasCredentials> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    match args.resolve(&mut input, &mut output) {
        Ok(credentials) if credentials.username.is_empty() || credentials.cluster_host.is_empty() => {
            eprintln!("Username and cluster host are required.");
            None
        }
        Ok(credentials) => Some(credentials),
        Err(e) => {
            eprintln!("Could not read input: {}", e);
            None
        }
    }
}

async fn test(credentials: AtlasCredentials, env_file: PathBuf, no_write: bool) -> ExitCode {
    let uri = atlas::build_connection_string(&credentials);
    println!("Testing {}", redact_uri(&uri));

    match atlas::ping(&uri, PING_TIMEOUT).await {
        Ok(elapsed) => {
            println!("Connected. Ping took {} ms.", elapsed.as_millis());
        }
        Err(e) => {
            let kind = FailureKind::classify(&e);
            tracing::debug!(error = ?e, "ping failed");
            eprintln!("Connection failed ({:?}): {}", kind, e);
            for hint in kind.hints() {
                eprintln!("  - {}", hint);
            }
            return ExitCode::FAILURE;
        }
    }

    if no_write {
        return ExitCode::SUCCESS;
    }

    match atlas::write_env_var(&env_file, atlas::ENV_KEY, &uri) {
        Ok(()) => {
            println!("Saved {} to {}", atlas::ENV_KEY, env_file.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Could not write {}: {}", env_file.display(), e);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    match cli.command {
        Command::Encode {
            credentials,
            reveal,
        } => {
            let Some(credentials) = read_credentials(credentials) else {
                return ExitCode::FAILURE;
            };
            let uri = atlas::build_connection_string(&credentials);
            if reveal {
                println!("{}", uri);
            } else {
                println!("{}", redact_uri(&uri));
            }
            ExitCode::SUCCESS
        }
        Command::Test {
            credentials,
            env_file,
            no_write,
        } => {
            let Some(credentials) = read_credentials(credentials) else {
                return ExitCode::FAILURE;
            };
            test(credentials, env_file, no_write).await
        }
    }
}
