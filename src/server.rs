//! HTTP server lifecycle

use crate::{
    api::{self, AppState},
    config::ServerConfig,
    error::{ImagingError, Result},
    processor::ImagingProcessor,
};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// A configured service, ready to serve
#[derive(Debug)]
pub struct Application {
    config: ServerConfig,
    router: Router,
}

impl Application {
    /// Build the processor and router from configuration
    ///
    /// # Errors
    /// - Invalid configuration, storage or HTTP client setup failure
    pub fn new(config: ServerConfig) -> Result<Self> {
        let processor = ImagingProcessor::new(config.clone())?;
        Ok(Self::with_processor(processor))
    }

    /// Build around an existing processor (custom providers, tests)
    #[must_use]
    pub fn with_processor(processor: ImagingProcessor) -> Self {
        let config = processor.config().clone();
        let router = api::router(AppState::new(processor));
        Self { config, router }
    }

    /// The application router, for embedding or in-process testing
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind and serve until `shutdown` resolves
    ///
    /// # Errors
    /// - The address cannot be bound or the server fails
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ImagingError::internal(format!("Failed to bind {addr}: {e}")))?;
        let local_addr = listener.local_addr().unwrap_or(addr);
        log_listening(local_addr, &self.config);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

fn log_listening(addr: SocketAddr, config: &ServerConfig) {
    tracing::info!(
        address = %addr,
        uploads = %config.uploads_dir.display(),
        processed = %config.processed_dir.display(),
        "Product studio listening on http://{}, available at http://localhost:{}",
        addr,
        addr.port()
    );
}

/// Wait for Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
