//! Web server for the trigger surface.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{FeedpinError, Result};
use crate::service::StickyService;

use super::handlers::AppState;
use super::router::{create_health_router, create_router};

/// HTTP server for the trigger and override routes.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &ServerConfig, service: Arc<StickyService>) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                FeedpinError::Config(format!(
                    "invalid server address {}:{}: {}",
                    config.host, config.port, e
                ))
            })?;

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(service)),
        })
    }

    /// Get the configured server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn router(&self) -> axum::Router {
        create_router(Arc::clone(&self.app_state)).merge(create_health_router())
    }

    /// Run the web server.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        tracing::info!("Web server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// Binding to port 0 picks a free port.
    pub async fn run_with_addr(self) -> std::result::Result<SocketAddr, std::io::Error> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::platform::MemoryPlatform;
    use crate::slots::{MemoryKvStore, SlotStateStore};

    fn service() -> Arc<StickyService> {
        let state = SlotStateStore::new(Arc::new(MemoryKvStore::new()));
        Arc::new(
            StickyService::new(
                &Config::default(),
                state,
                Arc::new(MemoryPlatform::default()),
            )
            .unwrap(),
        )
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let server = WebServer::new(&test_config(), service()).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_web_server_bad_host() {
        let config = ServerConfig {
            host: "not an address".to_string(),
            ..test_config()
        };
        assert!(matches!(
            WebServer::new(&config, service()),
            Err(FeedpinError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let server = WebServer::new(&test_config(), service()).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let resp = reqwest::Client::new()
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "OK");
    }
}
