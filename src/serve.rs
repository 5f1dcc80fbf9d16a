//! HTTP API for geolocation lookups.
//!
//! Two routes, both GET:
//!
//! - `/{ip}` answers for the address in the path
//! - `/` answers for the caller's own address
//!
//! A hit returns the flat JSON lookup report; an address outside every
//! block returns 404 and anything that is not an IPv4 address returns 400,
//! both with a small JSON error body.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::GeoDb;
use crate::error::Result;

/// Default listen address for the API server.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:9001";

/// Build the lookup router over a loaded database.
pub fn router(db: Arc<GeoDb>) -> Router {
    Router::new()
        .route("/", get(lookup_caller))
        .route("/{ip}", get(lookup_path))
        .with_state(db)
}

/// Run the API server until it fails or the process exits.
pub async fn serve(db: Arc<GeoDb>, listen: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("geolocation API listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        router(db).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// [`serve`] on a runtime of its own, for synchronous callers.
pub fn serve_blocking(db: Arc<GeoDb>, listen: SocketAddr) -> Result<()> {
    tokio::runtime::Runtime::new()?.block_on(serve(db, listen))
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(ApiError { error: message })).into_response()
}

fn answer(db: &GeoDb, ip: Ipv4Addr) -> Response {
    match db.lookup(ip) {
        Some(geo) => (StatusCode::OK, Json(geo.response())).into_response(),
        None => json_error(
            StatusCode::NOT_FOUND,
            format!("no address block contains {ip}"),
        ),
    }
}

async fn lookup_path(State(db): State<Arc<GeoDb>>, Path(addr): Path<String>) -> Response {
    match addr.parse::<Ipv4Addr>() {
        Ok(ip) => answer(&db, ip),
        Err(_) => json_error(
            StatusCode::BAD_REQUEST,
            format!("not an IPv4 address: {addr}"),
        ),
    }
}

async fn lookup_caller(
    State(db): State<Arc<GeoDb>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    match peer.ip() {
        IpAddr::V4(ip) => answer(&db, ip),
        IpAddr::V6(_) => json_error(
            StatusCode::BAD_REQUEST,
            format!("caller address {} is not IPv4", peer.ip()),
        ),
    }
}
