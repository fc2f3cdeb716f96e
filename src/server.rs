//! Top-level server
//!
//! Owns the store and the process configuration, builds the HTTP
//! router, and drives the listen/serve/shutdown lifecycle.

use tracing::info;

use crate::auth::ExpectedToken;
use crate::config::ServerConfig;
use crate::http;
use crate::store::Store;

pub struct Server {
    config: ServerConfig,
    store: Store,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let store = Store::new(config.store_config());
        Self { config, store }
    }

    /// Binds, serves, and blocks until `shutdown` resolves, then closes
    /// the store (writing its snapshot) before returning.
    pub async fn run(self, shutdown: impl std::future::Future<Output = ()>) -> anyhow::Result<()> {
        self.store.run().await?;

        let expected_token = ExpectedToken(self.config.expected_token());
        let router = http::build_router(self.store.clone(), expected_token);

        let listener = tokio::net::TcpListener::bind(&self.config.socket).await?;
        info!(socket = %self.config.socket, "shardkv listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("shutting down, writing snapshot");
        self.store.close().await?;
        Ok(())
    }
}
