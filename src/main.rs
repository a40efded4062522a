use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;

use babelchat::config::AppConfig;
use babelchat::directory::Directory;
use babelchat::dispatcher::Dispatcher;
use babelchat::http;
use babelchat::logger::init_tracing;
use babelchat::push::{HttpPushChannel, PushChannel};
use babelchat::store::{EntityStore, MemoryStore};
use babelchat::translator::{HttpTranslator, Translator};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info");

    let config = AppConfig::from_env()?;

    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    let translator: Arc<dyn Translator> = Arc::new(HttpTranslator::new(&config.translator));
    let push: Arc<dyn PushChannel> = Arc::new(HttpPushChannel::new(&config.push));
    let dispatcher = Arc::new(Dispatcher::new(Directory::new(store), translator, push));

    let app = http::router(dispatcher);
    let listener = TcpListener::bind(config.http_addr).await?;
    info!("listening on http://{}", config.http_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
