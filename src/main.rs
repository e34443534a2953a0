use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tracesieve")]
#[command(about = "Cluster trace preparation for simulator replay", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter, validate and reconcile the configured trace files
    Run,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Compare a run report against a baseline report
    Verify {
        #[arg(long)]
        baseline: PathBuf,

        /// Report to check (defaults to outputs.report from the config)
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracesieve=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = tracesieve::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run) | None => {
            tracesieve::cli::run::run(config_path).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                tracesieve::cli::config::init(stdout)?;
            }
        },
        Some(Commands::Verify { baseline, report }) => {
            let report = match report {
                Some(path) => path,
                None => {
                    let path = config_path
                        .ok_or("no --report given and no config found to locate the report")?;
                    tracesieve::config::load_config(&path)?.outputs.report
                }
            };
            if !tracesieve::cli::verify::verify(&baseline, &report)? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
