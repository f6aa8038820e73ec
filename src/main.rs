mod config;
mod features;
mod pr;
mod session;

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use features::{FeatureKind, FeatureSettings};
use pr::{ChangeSource, GitHubClient};

/// PR Assistant — fetches a GitHub Pull Request's changed files and reviews
/// and renders diffs, quality hints, dependencies and statistics.
///
/// Without a PR URL it starts an interactive menu.
#[derive(Parser, Debug)]
#[command(name = "pr-assistant", version, about)]
struct Cli {
    /// GitHub Pull Request URL (e.g., https://github.com/org/repo/pull/42).
    /// Runs once and exits instead of opening the menu.
    pr_url: Option<String>,

    /// GitHub personal access token (overrides config file and GITHUB_TOKEN)
    #[arg(short, long)]
    token: Option<String>,

    /// Feature to run for a one-shot PR URL
    #[arg(short, long, value_enum, default_value_t = FeatureKind::Extract)]
    feature: FeatureKind,

    /// Path to the config file (default: ./.pr-assistant.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = match config::Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let token = match config.github_token(cli.token.as_deref()) {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let source: Arc<dyn ChangeSource> = Arc::new(GitHubClient::new(token, config.api_url()));
    let settings = FeatureSettings::from(&config);

    match cli.pr_url {
        Some(pr_url) => run_once(&pr_url, cli.feature, source, &settings).await,
        None => {
            let stdin = io::stdin();
            let mut session = session::Session::new(source, settings, stdin.lock(), io::stdout());
            match session.run().await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!(error = %e, "console I/O failed");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn run_once(
    pr_url: &str,
    kind: FeatureKind,
    source: Arc<dyn ChangeSource>,
    settings: &FeatureSettings,
) -> ExitCode {
    let feature = kind.build(source, settings);
    let mut stdout = io::stdout();
    let result = feature
        .process(pr_url, &mut stdout)
        .instrument(info_span!("pr_assist", pr_url = %pr_url, feature = feature.name()))
        .await;

    match result {
        Ok(()) => {
            info!("done");
            stdout.flush().map_or(ExitCode::FAILURE, |_| ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "feature failed");
            if let Err(io_err) = report_failure_to_stdout(&e) {
                error!(error = %io_err, "could not write failure report");
            }
            ExitCode::FAILURE
        }
    }
}

fn report_failure_to_stdout(err: &features::FeatureError) -> io::Result<()> {
    let mut stdout = io::stdout();
    session::report_failure(&mut stdout, err)?;
    stdout.flush()
}
