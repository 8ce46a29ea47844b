use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::{cookies, jwt::JwtKeys};
use crate::error::ApiError;
use crate::state::AppState;

/// Extracts and verifies the session cookie, yielding the user ID.
///
/// Rejection is always an [`ApiError::Auth`]: absent cookie, malformed
/// token and bad signature/expiry are deliberately indistinguishable to
/// the client.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookies::extract_session_token(&parts.headers)
            .ok_or_else(|| ApiError::auth("Not authorized, login again"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|e| {
            warn!(error = %e, "invalid or expired session token");
            ApiError::auth("Not authorized, login again")
        })?;

        Ok(AuthUser(claims.sub))
    }
}
