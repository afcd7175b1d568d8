//! A static file server for the development output, with live reload.

use std::net::{Ipv4Addr, SocketAddr};

use axum::{routing::get, Router};
use camino::{Utf8Path, Utf8PathBuf};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

mod client;
mod reload;

pub use self::reload::{Reload, ReloadHandle};

#[derive(thiserror::Error, miette::Diagnostic, Debug)]
pub enum PreviewError {
    #[error("Couldn't start the preview server on port {port}")]
    #[diagnostic(help("is something else already using that port?"))]
    Bind {
        port: u16,
        source: std::io::Error,
    },
    #[error("The preview server stopped unexpectedly")]
    Serve(#[source] std::io::Error),
}

/// Builds the preview routes: the reload client, its socket, and the site itself
pub fn router(site_root: &Utf8Path, reload: ReloadHandle) -> Router {
    Router::new()
        .route(client::CLIENT_PATH, get(client::client_script))
        .route(client::RELOAD_PATH, get(reload::reload_socket))
        .fallback_service(ServeDir::new(site_root))
        .layer(axum::middleware::map_response(client::inject_reload_client))
        .with_state(reload)
}

pub struct PreviewServer {
    listener: TcpListener,
    site_root: Utf8PathBuf,
    reload: ReloadHandle,
}

impl PreviewServer {
    /// Binds to localhost on `port`. Port 0 picks any free port.
    pub async fn bind(port: u16, site_root: Utf8PathBuf) -> Result<PreviewServer, PreviewError> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
            .await
            .map_err(|source| PreviewError::Bind { port, source })?;

        Ok(PreviewServer {
            listener,
            site_root,
            reload: ReloadHandle::new(),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    pub fn url(&self) -> Option<String> {
        self.local_addr().map(|addr| format!("http://{addr}"))
    }

    pub fn reload_handle(&self) -> ReloadHandle {
        self.reload.clone()
    }

    /// Serves until the process ends
    #[tracing::instrument(skip(self), fields(root = %self.site_root))]
    pub async fn serve(self) -> Result<(), PreviewError> {
        let app = router(&self.site_root, self.reload);
        tracing::info!("Preview server listening on {:?}", self.listener.local_addr());

        axum::serve(self.listener, app)
            .await
            .map_err(PreviewError::Serve)
    }
}
