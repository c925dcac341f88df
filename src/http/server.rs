//! HTTP server for the health endpoints.
//!
//! # Responsibilities
//! - Mount the readiness and liveness handlers
//! - Wire up middleware (tracing)
//! - Bind the listener and serve until the run context is cancelled

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::health::HttpHandler;
use crate::registry::{
    init, Bindings, BoxError, Component, Configurable, InitError, Mutator, Slot, Start, Validate,
};

/// Path answered by the handler registered as `readiness`.
pub const READY_PATH: &str = "/ready";
/// Path answered by the handler registered as `liveness`.
pub const HEALTHY_PATH: &str = "/healthy";

/// Serves `/ready` and `/healthy`.
pub struct HttpServer {
    bind_address: String,
    readiness: Slot<HttpHandler>,
    liveness: Slot<HttpHandler>,
    local_addr: watch::Sender<Option<SocketAddr>>,
}

impl Configurable for HttpServer {
    fn defaults(&mut self) {
        self.bind_address = "0.0.0.0:8080".to_string();
    }
}

impl HttpServer {
    pub fn new(mutators: &[Mutator]) -> Result<Self, InitError> {
        let (local_addr, _) = watch::channel(None);
        let mut server = Self {
            bind_address: String::new(),
            readiness: Slot::new(),
            liveness: Slot::new(),
            local_addr,
        };
        init(&mut server, mutators)?;
        Ok(server)
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// The address actually bound, once the server is listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.borrow()
    }

    /// Follow the bound address; `None` until the listener is up.
    pub fn watch_local_addr(&self) -> watch::Receiver<Option<SocketAddr>> {
        self.local_addr.subscribe()
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Result<Router, BoxError> {
        let (Some(readiness), Some(liveness)) = (self.readiness.get(), self.liveness.get()) else {
            return Err("readiness and liveness handlers must both be bound".into());
        };
        Ok(Router::new()
            .merge(readiness.routes(READY_PATH))
            .merge(liveness.routes(HEALTHY_PATH))
            .layer(TraceLayer::new_for_http()))
    }
}

impl Component for HttpServer {
    fn bind(&self, bindings: &mut Bindings) {
        bindings
            .tagged("readiness", "readiness", &self.readiness)
            .tagged("liveness", "liveness", &self.liveness);
    }

    fn as_validate(&self) -> Option<&dyn Validate> {
        Some(self)
    }

    fn as_start(&self) -> Option<&dyn Start> {
        Some(self)
    }
}

impl Validate for HttpServer {
    fn validate(&self) -> Result<(), BoxError> {
        if !self.readiness.is_set() {
            return Err("no `readiness` handler bound".into());
        }
        if !self.liveness.is_set() {
            return Err("no `liveness` handler bound".into());
        }
        Ok(())
    }
}

#[async_trait]
impl Start for HttpServer {
    async fn start(&self, ctx: CancellationToken) -> Result<(), BoxError> {
        let router = self.router()?;
        let listener = TcpListener::bind(&self.bind_address).await?;
        let addr = listener.local_addr()?;
        self.local_addr.send_replace(Some(addr));
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { ctx.cancelled().await })
            .await?;

        self.local_addr.send_replace(None);
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Listen address. Defaults to `0.0.0.0:8080`.
pub fn with_bind_address(address: impl Into<String>) -> Mutator {
    let address = address.into();
    Mutator::new(move |s: &mut HttpServer| {
        if address.is_empty() {
            return Err("bind address must not be empty".into());
        }
        s.bind_address = address.clone();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let server = HttpServer::new(&[]).unwrap();
        assert_eq!(server.bind_address(), "0.0.0.0:8080");
        assert!(server.local_addr().is_none());

        let server = HttpServer::new(&[with_bind_address("127.0.0.1:0")]).unwrap();
        assert_eq!(server.bind_address(), "127.0.0.1:0");
    }

    #[test]
    fn test_unbound_server_is_invalid() {
        let server = HttpServer::new(&[]).unwrap();
        assert!(server.validate().is_err());
        assert!(server.router().is_err());
    }

    #[test]
    fn test_empty_bind_address_rejected() {
        assert!(HttpServer::new(&[with_bind_address("")]).is_err());
    }
}
