mod server;

use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use reledit::Page;
use reledit::config::Config;
use reledit::models::Region;
use reledit::render::MemoryDocument;
use reledit::transport::HttpTransport;

use crate::server::RelEditServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the tool protocol, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;

    // One-shot mode: load a single url into a scratch region and print it
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 2 && args[1] == "--load" {
        return load_once(config, &args[2]).await;
    }

    tracing::info!(base_url = %config.base_url, "starting reledit tool server");
    let server = RelEditServer::new(config)?;
    let service = server.serve(stdio()).await?;

    service.waiting().await?;
    Ok(())
}

async fn load_once(config: Config, url: &str) -> anyhow::Result<()> {
    let transport = Arc::new(HttpTransport::new(&config)?);
    let document = Arc::new(MemoryDocument::new());
    let page = Page::new(config, transport, document.clone());

    page.engine.register(Region::lazy("main", url)).await;
    page.lazy.load_now("main", None).await?;

    let markup = document.content("main").unwrap_or_default();
    println!("{}", html2md::parse_html(&markup));
    Ok(())
}
