use std::net::SocketAddr;

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::state::AppState;
use crate::ws::actor;

/// GET /ws
/// WebSocket upgrade endpoint. When `allowed_origin` is configured, upgrades from
/// any other Origin are refused before the handshake completes.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if let Some(allowed) = &state.allowed_origin {
        let origin = headers
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok());
        if origin != Some(allowed.as_str()) {
            tracing::warn!(
                address = %addr,
                origin = origin.unwrap_or("<none>"),
                "Rejected WebSocket upgrade from foreign origin"
            );
            return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
        }
    }

    tracing::debug!(address = %addr, "WebSocket upgrade accepted");
    ws.on_upgrade(move |socket| actor::run_connection(socket, state, addr))
}
