use axum::http::StatusCode;
use axum::Extension;

use super::AccountData;
use super::ApiSuccess;
use crate::inbound::http::middleware::AuthenticatedAccount;

pub async fn me(
    Extension(authenticated): Extension<AuthenticatedAccount>,
) -> ApiSuccess<AccountData> {
    ApiSuccess::new(StatusCode::OK, (&authenticated.account).into())
}
