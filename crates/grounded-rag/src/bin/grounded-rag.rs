//! grounded-rag command line
//!
//! ```text
//! grounded-rag ingest [--config PATH] [--document PATH]
//! grounded-rag ask "What services does Promtior offer?"
//! grounded-rag serve
//! ```

use clap::{Parser, Subcommand};
use grounded_rag::{
    agent::{Agent, AgentInput},
    config::RagConfig,
    ingestion::IngestPipeline,
    server::RagServer,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "grounded-rag", version, about = "Fact-grounded question answering over a crawled site and a presentation")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl the sitemaps, load the document and publish a new index
    Ingest {
        /// Override the presentation document path
        #[arg(long)]
        document: Option<PathBuf>,
    },
    /// Answer one question from the published index
    Ask {
        /// The question
        question: String,
    },
    /// Serve the agent over HTTP
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grounded_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = RagConfig::load(cli.config.as_deref())?;
    if let Command::Ingest {
        document: Some(path),
    } = &cli.command
    {
        config.sources.document_path = Some(path.clone());
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - LLM model: {}", config.llm.model);
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Index: {}", config.index.path.display());

    match cli.command {
        Command::Ingest { .. } => {
            let report = IngestPipeline::from_config(config)?.run().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Ask { question } => {
            let agent = Agent::from_config(&config)?;
            let output = agent.invoke(AgentInput::new(question)).await?;
            println!("{}\n", output.answer);
            for source in &output.sources {
                println!("  {}", source.label());
            }
        }
        Command::Serve => {
            let server = RagServer::new(config)?;
            println!("\nServer starting...");
            println!("  Health: http://{}/health", server.address());
            println!("  Agent:  POST http://{}/agent/invoke", server.address());
            println!("\nPress Ctrl+C to stop\n");
            server.start().await?;
        }
    }

    Ok(())
}
