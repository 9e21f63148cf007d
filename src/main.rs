use anyhow::{Context, Result};
use clap::Parser;
use scriptbridge::cli::{Cli, Commands};
use scriptbridge::{utils, Settings, ToolRegistry};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Settings::new().context("Failed to load configuration")?,
    };

    // stdout carries tool output; logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let registry = ToolRegistry::from_config(&settings.adapter).await;
    utils::print_failures(registry.registration_failures());

    match cli.command {
        Commands::List { json } => handle_list(&registry, json),
        Commands::Call { tool, args } => handle_call(&registry, &tool, &args).await,
    }
}

fn handle_list(registry: &ToolRegistry, json: bool) -> Result<()> {
    let descriptors = registry.list_tools();

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    utils::print_header(&format!("{} tools", descriptors.len()));
    for descriptor in &descriptors {
        utils::print_descriptor(descriptor);
    }
    Ok(())
}

async fn handle_call(registry: &ToolRegistry, tool: &str, args: &str) -> Result<()> {
    let arguments: Value =
        serde_json::from_str(args).context("--args must be a JSON object")?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let outcome = registry.call_tool(tool, arguments, &cancel).await?;
    utils::print_outcome(&outcome);

    if outcome.is_error {
        std::process::exit(1);
    }
    Ok(())
}
