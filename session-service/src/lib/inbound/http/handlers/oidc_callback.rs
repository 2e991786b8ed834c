use auth::TokenPair;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

pub async fn oidc_callback(
    State(state): State<AppState>,
    Query(query): Query<OidcCallbackQuery>,
) -> Result<ApiSuccess<OidcCallbackResponseData>, ApiError> {
    let oidc_state = query.state.unwrap_or_default();

    if let Some(error) = query.error {
        // The flow has to start over.
        if let Err(e) = state.session_service.abandon_oidc_login(&oidc_state).await {
            tracing::warn!(error = %e, "Failed to discard OIDC exchange state");
        }

        tracing::info!(error = %error, description = ?query.error_description, "Provider returned an authorization error");
        return Err(ApiError::BadRequest(format!(
            "Authorization failed: {}",
            error
        )));
    }

    let login = state
        .session_service
        .login_with_oidc_callback(query.code.as_deref().unwrap_or_default(), &oidc_state)
        .await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        OidcCallbackResponseData {
            tokens: login.tokens,
            redirect_to: login.redirect_to,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OidcCallbackQuery {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OidcCallbackResponseData {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub redirect_to: String,
}
