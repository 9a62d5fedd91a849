mod chat;
mod session;

use anyhow::Result;
use chat::ChatApp;
use clap::Parser;
use phaseweave_llm::{LlmClient, LlmConfig};
use phaseweave_n8n::{N8nClient, N8nConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "phaseweave",
    about = "Conversational n8n workflow builder: draft automations phase by phase"
)]
struct Args {
    /// n8n base URL (default: $N8N_BASE_URL or http://localhost:5678)
    #[arg(long)]
    n8n_url: Option<String>,

    /// n8n API key (default: $N8N_API_KEY)
    #[arg(long)]
    n8n_api_key: Option<String>,

    /// OpenAI-compatible chat completions endpoint
    #[arg(long, default_value = "http://localhost:1234/v1")]
    llm_url: String,

    /// Model to draft with
    #[arg(long, default_value = "local-model")]
    model: String,

    /// API key for the LLM endpoint (default: $LLM_API_KEY)
    #[arg(long)]
    llm_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut n8n_config = N8nConfig::default();
    if let Some(url) = args.n8n_url {
        n8n_config = N8nConfig::new(url, n8n_config.api_key);
    }
    if let Some(key) = args.n8n_api_key {
        n8n_config.api_key = key;
    }

    let llm_config = LlmConfig {
        base_url: args.llm_url,
        api_key: args.llm_api_key.or_else(|| std::env::var("LLM_API_KEY").ok()),
        model: args.model,
        ..LlmConfig::default()
    };

    let n8n = N8nClient::new(n8n_config);
    if let Err(err) = n8n.ping().await {
        eprintln!("Warning: cannot reach n8n at {}: {err}", n8n.config().base_url);
        eprintln!("  {}", err.suggestion());
        eprintln!("  Drafting will work, but phase submissions will fail until this is fixed.\n");
    }

    ChatApp::new(LlmClient::new(llm_config), n8n).run().await
}
