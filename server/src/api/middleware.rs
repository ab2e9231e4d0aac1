use crate::api::error::ApiResult;
use crate::app::AppState;
use crate::auth::Client;
use crate::auth::header::{self, AuthenticationError};
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

/// Authenticates the bearer token of a request and makes the [`Client`] available
/// to handlers as an extension. Requests without valid credentials are rejected.
pub async fn auth(State(state): State<AppState>, mut request: Request, next: Next) -> ApiResult<Response> {
    let auth_value = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthenticationError::MissingCredentials)?;
    let auth_value = auth_value.to_str().map_err(|_| AuthenticationError::InvalidAuthType)?;
    let user = header::authenticate_bearer(&state, auth_value)?;

    request.extensions_mut().insert(Client::new(&user));
    Ok(next.run(request).await)
}
