use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiSuccess;
use crate::inbound::http::router::AppState;
use crate::session::models::LogoutOutcome;
use crate::session::models::LogoutRequest;

/// Always succeeds. The body is optional.
pub async fn logout(
    State(state): State<AppState>,
    body: Option<Json<LogoutRequestBody>>,
) -> ApiSuccess<LogoutOutcome> {
    let request = body
        .map(|Json(body)| LogoutRequest {
            oidc_session: body.oidc_session,
            post_logout_redirect: body.post_logout_redirect,
        })
        .unwrap_or_default();

    let outcome = state.session_service.logout(request).await;
    ApiSuccess::new(StatusCode::OK, outcome)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LogoutRequestBody {
    #[serde(default)]
    oidc_session: bool,
    #[serde(default)]
    post_logout_redirect: Option<String>,
}
