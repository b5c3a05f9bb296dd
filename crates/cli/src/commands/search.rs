//! `ragpilot search`: query the knowledge-base index directly.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use ragpilot_config::AppConfig;
use ragpilot_core::message::Message;
use ragpilot_retrieval::{Collection, InMemoryVectorStore, Retriever, SearchOptions};

use super::load_config;

#[derive(Args)]
pub struct SearchArgs {
    /// The search query
    #[arg(short, long)]
    pub query: String,

    /// Search pages and chunks together
    #[arg(long)]
    pub hybrid: bool,

    /// Collection to search when not hybrid
    #[arg(long, default_value = "chunks")]
    pub collection: Collection,

    /// Number of results (defaults to retrieval.limit)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Print scored items as JSON instead of text
    #[arg(long)]
    pub structured: bool,

    /// Index file (defaults to retrieval.index_path)
    #[arg(long)]
    pub index: Option<PathBuf>,
}

impl SearchArgs {
    fn index_path(&self, config: &AppConfig) -> Option<PathBuf> {
        self.index
            .clone()
            .or_else(|| config.retrieval.index_path.as_ref().map(PathBuf::from))
    }

    fn options(&self, config: &AppConfig) -> SearchOptions {
        let mut options = SearchOptions::from_config(&config.retrieval).with_collection(self.collection);
        if let Some(limit) = self.limit {
            options.limit = limit.max(1);
        }
        options
    }
}

pub async fn run(args: SearchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let index = args
        .index_path(&config)
        .ok_or("No index configured: set retrieval.index_path or pass --index")?;

    let store = InMemoryVectorStore::load(&index).await?;
    let provider = ragpilot_providers::build_from_config(&config);
    let retriever = Retriever::new(provider, Arc::new(store), &config.retrieval.embedding_model);

    let messages = vec![Message::user(args.query.clone())];
    let response = if args.hybrid {
        retriever
            .hybrid_search(messages, config.retrieval.page_limit, config.retrieval.chunk_limit)
            .await
    } else {
        retriever.search(messages, args.options(&config)).await
    };

    if args.structured {
        println!("{}", serde_json::to_string_pretty(&response.structured)?);
    } else {
        println!("{}", response.content);
    }
    Ok(())
}
