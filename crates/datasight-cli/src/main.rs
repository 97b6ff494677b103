use anyhow::Result;
use clap::Parser;
use datasight_cli::app;
use datasight_core::llm::ProviderId;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "datasight")]
#[command(about = "DataSight - conversational data analysis")]
#[command(version)]
struct Cli {
    /// Ask a single question and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// LLM model to use
    #[arg(short, long)]
    model: Option<String>,

    /// LLM provider (openai, openrouter, ollama, lmstudio)
    #[arg(long)]
    provider: Option<String>,

    /// Directory for conversation and dataset history
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut settings = datasight_core::Settings::load();

    if let Some(ref provider) = cli.provider {
        settings.set_provider(ProviderId::parse(provider));
    }
    if let Some(ref model) = cli.model {
        settings.llm.model = model.clone();
    }
    if let Some(dir) = cli.data_dir {
        settings.storage.data_dir = Some(dir);
    }
    if let Some(secs) = cli.timeout {
        settings.llm.timeout_secs = secs;
    }

    if let Some(prompt) = cli.prompt {
        app::run_single_prompt(&settings, &prompt).await?;
    } else {
        app::run_repl(settings).await?;
    }

    Ok(())
}
