use axum::{extract::State, Json};
use axum_extra::extract::CookieJar;
use chrono::Duration;
use serde_json::{json, Value};

use crate::auth::{cleared_session_cookie, generate_jwt, session_cookie, Claims};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /jwt - sign the posted identity and set it as the session cookie
///
/// The body is signed as-is (normally `{ "email": "..." }`) with the
/// configured expiry.
pub async fn issue(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let payload = match body {
        Value::Object(map) => map,
        _ => return Err(ApiError::bad_request("Request body must be a JSON object")),
    };

    let security = &state.config.security;
    let claims = Claims::new(payload, Duration::days(security.session_expiry_days));
    let token = generate_jwt(&claims, &security.session_secret)?;

    tracing::debug!("Issued session for {:?}", claims.email());
    let jar = jar.add(session_cookie(token, state.config.is_production()));
    Ok((jar, Json(json!({ "success": true }))))
}

/// GET /logout - expire the session cookie
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.add(cleared_session_cookie(state.config.is_production()));
    (jar, Json(json!({ "success": true })))
}
