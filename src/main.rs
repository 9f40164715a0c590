use anyhow::Result;
use clap::Parser;
use plugvm::http::HttpClient;
use plugvm::install::worker;
use plugvm::registry::NpmRegistry;
use plugvm::runtime::RealRuntime;

/// plugvm - versioned package cache for a core runtime and its plugins
///
/// The binary only exposes the install worker. Loaders start it with
/// `plugvm worker`, write one JSON install request to its stdin and read
/// one JSON reply from its stdout.
///
/// Logging goes to stderr and is controlled by RUST_LOG.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve a single install request over stdin/stdout
    Worker(WorkerArgs),
}

#[derive(clap::Args, Debug)]
pub struct WorkerArgs {}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    match cli.command {
        Commands::Worker(_args) => {
            let registry = NpmRegistry::new(runtime, HttpClient::default());
            worker::serve_stdio(&runtime, &registry).await?
        }
    }
    Ok(())
}
