use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::auth::{validate_jwt, Claims, SESSION_COOKIE};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated session extracted from the `token` cookie
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub email: String,
    pub claims: Claims,
}

impl TryFrom<Claims> for AuthUser {
    type Error = ApiError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let email = claims
            .email()
            .ok_or_else(|| ApiError::unauthorized("unauthorized access"))?
            .to_string();
        Ok(Self { email, claims })
    }
}

/// Session middleware: verifies the signed cookie and injects `AuthUser`,
/// or answers 401 without running the wrapped handler.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::unauthorized("unauthorized access"))?;

    let claims = validate_jwt(token, &state.config.security.session_secret).map_err(|e| {
        tracing::debug!("Rejected session token: {}", e);
        ApiError::unauthorized("unauthorized access")
    })?;

    let auth_user = AuthUser::try_from(claims)?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
