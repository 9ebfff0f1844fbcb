//! Server half of the HTTP binding: serves this process's groups to peers.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use prost::Message;
use tracing::debug;

use hoard::Registry;

use crate::wire::GetResponse;

#[derive(Clone)]
struct ServerState {
    registry: Registry,
}

/// Builds the router serving `GET <base-path>{group}/{key}` for every group
/// in `registry`.
///
/// Responses: `200` with a protobuf [`GetResponse`] body on success, `404`
/// for an unknown group, `500` when the load or encoding fails, and `400`
/// for any other path shape.
pub fn router(base_path: &str, registry: Registry) -> Router {
    let route = format!("{base_path}{{group}}/{{key}}");
    Router::new()
        .route(&route, get(serve_get))
        .fallback(bad_request)
        .with_state(ServerState { registry })
}

async fn serve_get(
    State(state): State<ServerState>,
    Path((group_name, key)): Path<(String, String)>,
) -> Response {
    let Some(group) = state.registry.get(&group_name) else {
        return (
            StatusCode::NOT_FOUND,
            format!("no such group: {group_name}"),
        )
            .into_response();
    };
    group.stats().server_requests.add(1);
    debug!(group = group_name, key, "serving peer request");

    match group.get(&key).await {
        Ok(value) => {
            let body = GetResponse { value }.encode_to_vec();
            (
                [(header::CONTENT_TYPE, "application/x-protobuf")],
                body,
            )
                .into_response()
        }
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, "bad request").into_response()
}
