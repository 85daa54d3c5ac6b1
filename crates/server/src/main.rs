mod api;
mod cli;
mod router;
mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use caseflow_core::{Config, RuleId};
use caseflow_rules::{RuleCatalog, RuleRunner, ShellRunner};
use caseflow_scheduler::{TriggerSource, WorkflowScheduler};

use crate::cli::{CliArgs, Command};
use crate::state::AppState;

fn load_config() -> Config {
    caseflow_core::config::load_dotenv();
    Config::from_env()
}

fn load_catalog(config: &Config) -> anyhow::Result<RuleCatalog> {
    match config.workflow.rules_file {
        Some(ref path) => RuleCatalog::load(path)
            .with_context(|| format!("failed to load rule overrides from {}", path.display())),
        None => Ok(RuleCatalog::builtin()),
    }
}

fn build_scheduler(config: &Config) -> anyhow::Result<Arc<WorkflowScheduler>> {
    let catalog = load_catalog(config)?;
    let commands = ShellRunner::new(&config.workflow.working_dir);
    let rules = RuleRunner::new(
        Arc::new(catalog),
        Arc::new(commands),
        config.workflow.command_timeout(),
    );
    let scheduler = WorkflowScheduler::from_config(rules, config)
        .context("invalid workflow configuration")?;
    Ok(Arc::new(scheduler))
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let scheduler = build_scheduler(config)?;
    let maintenance = scheduler.spawn_maintenance();

    let app = router::build_router(Arc::new(AppState::new(scheduler)));

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);
    info!("API docs at http://localhost:{}/docs", config.server.port);
    axum::serve(listener, app).await?;

    maintenance.abort();
    Ok(())
}

async fn run_once(config: &Config, rule: &str) -> anyhow::Result<()> {
    let id: RuleId = rule.parse()?;
    let scheduler = build_scheduler(config)?;
    let result = scheduler.trigger_rule(id, TriggerSource::Cli).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn print_rules(config: &Config) -> anyhow::Result<()> {
    let catalog = load_catalog(config)?;
    let rules: Vec<_> = catalog.iter().collect();
    print!("{}", serde_yaml::to_string(&rules)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config();

    match args.command() {
        Command::Serve => {
            config.log_summary();
            serve(&config).await
        }
        Command::Run { rule } => run_once(&config, &rule).await,
        Command::Rules => print_rules(&config),
    }
}
