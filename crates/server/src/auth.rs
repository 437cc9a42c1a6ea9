//! HTTP Basic auth middleware guarding `/capi/v1/*`.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, middleware::Next, response::Response};
use axum_extra::{
    headers::{authorization::Basic, Authorization},
    TypedHeader,
};
use runtime::Runtime;

use crate::AppState;

/// Rejects with `401` unless the request carries the configured
/// username/password. Empty configured credentials still require an exact
/// (empty-string) match rather than disabling auth, so an operator who
/// forgot to set `APIAUTHUSERNAME`/`APIAUTHPASSWORD` gets a loud failure
/// instead of an silently-open control API.
pub async fn require_basic_auth<RT: Runtime>(
    State(state): State<Arc<AppState<RT>>>,
    header: Option<TypedHeader<Authorization<Basic>>>,
    request: axum::extract::Request,
    next: Next,
) -> Result<Response, StatusCode> {
    match header {
        Some(TypedHeader(creds)) if creds.username() == state.api_username && creds.password() == state.api_password => {
            Ok(next.run(request).await)
        },
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}
