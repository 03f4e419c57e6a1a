use std::io::Write;

use clap::{Parser, Subcommand};
use junit_viewer::recent::{run_recent, RecentArgs};
use junit_viewer::view::{run_view, ViewArgs};

#[derive(Debug, Parser)]
#[command(
    version = std::env!("CARGO_PKG_VERSION"),
    name = "junit-viewer",
    about = "Terminal viewer for JUnit XML test reports"
)]
struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Open JUnit XML files and render their reports
    View(ViewArgs),
    /// List or clear recently opened files
    Recent(RecentArgs),
}

fn main() -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            setup_logger()?;
            let cli = Cli::parse();
            match run(cli).await {
                Ok(exit_code) => std::process::exit(exit_code),
                Err(e) => {
                    log::error!("Error: {:?}", e);
                    std::process::exit(exitcode::SOFTWARE);
                }
            }
        })
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::View(view_args) => run_view(view_args).await,
        Commands::Recent(recent_args) => run_recent(recent_args),
    }
}

fn setup_logger() -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info);
    if let Ok(log) = std::env::var("JUNIT_VIEWER_LOG") {
        builder.parse_filters(&log);
    }
    builder.init();
    Ok(())
}
