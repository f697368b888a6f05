use std::collections::HashMap;

use axum::{
    Extension,
    extract::{Path, Query},
    http::StatusCode,
};

use crate::{api::AppState, warning};

/// `PUT /track/{track_id}?event=start|change|playing|paused|stop`
///
/// Publishes the track's metadata and the status implied by the event.
/// Responds `500` if the track cannot be looked up.
pub async fn track(
    Path(track_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<AppState>,
) -> (StatusCode, &'static str) {
    let event = params.get("event").map(String::as_str).unwrap_or_default();

    match state
        .reconciler
        .reconcile_from_notification(&track_id, event)
        .await
    {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(e) => {
            warning!("Failed to get track info for {}: {}", track_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}
