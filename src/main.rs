use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use iam_dashboard::{
    cli::{Dashboard, DashboardCli},
    config::DashboardConfig,
    dialog::{AssumeYes, TerminalDialogs},
    navigation::RouteLog,
    notify::ConsoleSink,
    observability, ActionOutcome, Ui,
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = DashboardCli::parse();
    let config = DashboardConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    observability::init(config.log_level);
    tracing::debug!(base_url = %config.base_url, "starting");

    let routes = Arc::new(RouteLog::default());
    let ui = if cli.yes || config.assume_yes {
        Ui::new(AssumeYes, ConsoleSink, routes.clone())
    } else {
        Ui::new(TerminalDialogs::stdio(), ConsoleSink, routes.clone())
    };

    let outcome = Dashboard::new(config, ui).run(cli.command).await;
    if let Some(route) = routes.last() {
        tracing::info!(path = route.path(), "returned to");
    }
    Ok(match outcome {
        ActionOutcome::Done | ActionOutcome::Cancelled => ExitCode::SUCCESS,
        ActionOutcome::Failed => ExitCode::FAILURE,
    })
}
