use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scriven::build::{self, build_site};
use scriven::config::Config;
use scriven::serve;
use scriven::watch::WatchLoop;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "scriven", version)]
#[command(about = "Builds a static blog from a directory of Markdown posts")]
struct Args {
    /// Project file to use instead of searching for `scriven.yaml` in the
    /// current directory and its parents
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory containing the post source files
    #[arg(long, global = true, value_name = "DIR")]
    posts: Option<PathBuf>,

    /// Directory the site is written to
    #[arg(short, long, global = true, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Log every post and file written
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the site once
    Build,

    /// Build the site, then rebuild on changes and serve it over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = match verbose {
        true => EnvFilter::new("debug"),
        false => EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: Args) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) => Config::from_project_file(path)?,
        None => {
            let dir = std::env::current_dir().context("Getting the current directory")?;
            Config::from_directory(&dir)?
        }
    };
    if let Some(posts) = args.posts {
        config.posts_directory = posts;
    }
    if let Some(output) = args.output {
        config.output_directory = output;
    }

    match args.command {
        Command::Build => match build_site(&config) {
            Ok(_) => Ok(ExitCode::SUCCESS),
            Err(err) => {
                eprintln!("{}", describe(&err));
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve_site(config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Formats a build error as `error[<kind>]: <path>: <message>`.
fn describe(err: &build::Error) -> String {
    match err.path() {
        Some(path) => format!("error[{}]: {}: {}", err.kind(), path.display(), err),
        None => format!("error[{}]: {}", err.kind(), err),
    }
}

fn serve_site(config: Config) -> Result<()> {
    let addr = config.server.socket_addr();
    let output_directory = config.output_directory.clone();

    // Record the posts directory before the first build so edits saved
    // while it runs still trigger a rebuild.
    let rebuild_config = config.clone();
    let watcher = WatchLoop::new(
        &config.posts_directory,
        config.server.poll_interval,
        move || {
            build_site(&rebuild_config)
                .map(|_| ())
                .map_err(|err| describe(&err))
        },
    );

    // A broken initial build still serves; the watch loop retries once the
    // posts change.
    if let Err(err) = build_site(&config) {
        error!("{}", describe(&err));
    }

    let runtime = tokio::runtime::Runtime::new().context("Starting the async runtime")?;
    let result = runtime.block_on(async {
        tokio::task::spawn_blocking(move || watcher.run());
        serve::serve(&output_directory, addr).await
    });
    // The watch thread never returns on its own.
    runtime.shutdown_background();
    info!("stopped");
    result.with_context(|| format!("Serving on {}", addr))
}
