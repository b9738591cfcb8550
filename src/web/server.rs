//! Web server for slotbook.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use super::handlers::AppState;
use super::router::{create_health_router, create_router};

/// Web server for the auth surface.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(host: &str, port: u16, app_state: Arc<AppState>) -> Self {
        let addr = format!("{host}:{port}")
            .parse()
            .expect("Invalid web server address");

        Self { addr, app_state }
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn router(&self) -> axum::Router {
        create_router(self.app_state.clone()).merge(create_health_router())
    }

    /// Run the web server.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr, std::io::Error> {
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
