//! Deployment pointer handlers and live-reload events.

use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;

use super::super::AppState;
use super::super::error::AppError;
use super::super::types::{HealthResponse, PublishRequest};
use crate::registry::DeploymentInfo;

/// Name of the SSE event carrying a `DeploymentInfo` (or `null`).
pub const DEPLOYMENT_EVENT: &str = "deployment";

/// GET /_siteship/health - Liveness check.
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /_siteship/deployment - Publish the active deployment id.
pub(crate) async fn deployment_publish(
    State(state): State<AppState>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<DeploymentInfo>, AppError> {
    let info = state.notifier.publish(&req.deployment_id).await?;
    Ok(Json(info))
}

/// GET /_siteship/deployment - The active deployment, `null` before the first.
pub(crate) async fn deployment_get(
    State(state): State<AppState>,
) -> Result<Json<Option<DeploymentInfo>>, AppError> {
    Ok(Json(state.notifier.read().await?))
}

/// GET /_siteship/events - Stream deployment changes, current value first.
pub(crate) async fn deployment_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.notifier.subscribe();
    let stream = futures::stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first {
            // Sender dropped: server shutting down
            rx.changed().await.ok()?;
        }
        let info = rx.borrow_and_update().clone();
        let data = serde_json::to_string(&info).unwrap_or_else(|_| "null".to_string());
        let event = Event::default().event(DEPLOYMENT_EVENT).data(data);
        Some((Ok(event), (rx, false)))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
