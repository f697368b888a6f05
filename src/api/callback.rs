use std::collections::HashMap;

use axum::{Extension, extract::Query, http::StatusCode, response::Html};

use crate::{api::AppState, success, warning};

/// `GET /auth/spotify/callback?code=...`
///
/// Completes the authorization code grant. Responds `500` when the code is
/// missing, the user denied access, or Spotify rejects the code; the session
/// stays unauthenticated in all three cases.
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(state): Extension<AppState>,
) -> (StatusCode, Html<&'static str>) {
    if let Some(reason) = params.get("error") {
        warning!("Authorization was denied: {}", reason);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h4>Authorization denied.</h4>"),
        );
    }

    let Some(code) = params.get("code").filter(|c| !c.is_empty()) else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h4>Missing authorization code.</h4>"),
        );
    };

    match state.session.complete_authorization(code).await {
        Ok(_) => {
            success!("Authentication successful");
            (
                StatusCode::OK,
                Html("<h2>Authentication successful.</h2><p>Close browser window.</p>"),
            )
        }
        Err(e) => {
            warning!("Failed to authenticate: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html("<h4>Login failed.</h4>"),
            )
        }
    }
}
