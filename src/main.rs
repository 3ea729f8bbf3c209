//! Review Agent - CLI entry point
//!
//! Reviews the changes in a directory and streams the review to stdout.
//! Run `review-agent --help` for flags; see `config` for environment variables.

use clap::Parser;
use review_agent::{
    agent::{Agent, SessionOutcome},
    cli::Cli,
    config::Config,
};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the streamed review.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = cli.apply(Config::from_env()?)?;
    info!(
        model = %config.model,
        target = %config.target_directory.display(),
        max_steps = config.max_steps,
        "Loaded configuration"
    );

    let agent = Agent::new(config);
    let mut stdout = tokio::io::stdout();
    let report = agent.run(&mut stdout).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    let session = &report.session;
    match report.outcome {
        SessionOutcome::Completed => info!(
            steps = session.steps(),
            tool_calls = session.invocations().len(),
            "Review finished"
        ),
        SessionOutcome::StepCapReached => warn!(
            steps = session.steps(),
            tool_calls = session.invocations().len(),
            "Review stopped at the step cap; output may be incomplete"
        ),
    }

    Ok(())
}
