use axum::extract::Query;
use axum::extract::State;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Deserialize;

use super::ApiError;
use crate::inbound::http::router::AppState;

/// Redirect the user agent to the identity provider.
pub async fn oidc_login(
    State(state): State<AppState>,
    Query(query): Query<OidcLoginQuery>,
) -> Result<Response, ApiError> {
    let redirect = state
        .session_service
        .begin_oidc_login(query.redirect_to.as_deref())
        .await?;

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, redirect.authorization_url),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
    )
        .into_response())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OidcLoginQuery {
    #[serde(default)]
    redirect_to: Option<String>,
}
