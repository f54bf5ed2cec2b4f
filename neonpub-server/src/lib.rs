mod auth;
mod context;
mod docs;
mod errors;
mod live;
mod performances;
mod quiz;
mod reactions;
mod schemas;
mod serialized;
mod songs;
mod venues;

use std::{
    env, io,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::routing::get;
use context::ServerContext;
use log::info;
use neonpub_collab::Collab;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

pub type Router = axum::Router<ServerContext>;

#[derive(Debug, Error)]
pub enum StartError {
    #[error("NEONPUB_SERVER_PORT must be a port number, got {0}")]
    InvalidPort(String),
    #[error("Could not listen on port {port}: {source}")]
    Bind { port: u16, source: io::Error },
    #[error("Server stopped unexpectedly: {0}")]
    Serve(#[from] io::Error),
}

/// Starts the neonpub server
pub async fn run_server(collab: Arc<Collab>) -> Result<(), StartError> {
    let port = match env::var("NEONPUB_SERVER_PORT") {
        Ok(value) => value
            .parse::<u16>()
            .map_err(|_| StartError::InvalidPort(value))?,
        Err(_) => DEFAULT_PORT,
    };

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/venues", venues::router())
        .nest("/auth", auth::router())
        .nest("/songs", songs::router())
        .nest("/performances", performances::router())
        .nest("/quiz", quiz::router())
        .merge(reactions::router())
        .merge(live::router())
        .route("/docs", get(docs::docs));

    let root_router = axum::Router::new()
        .nest("/v1", version_one_router)
        .layer(cors)
        .with_state(ServerContext { collab });

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| StartError::Bind { port, source })?;

    info!("Listening on port {}", port);
    axum::serve(listener, root_router).await?;

    Ok(())
}
