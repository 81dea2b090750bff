use axum::{extract::FromRequestParts, http::header, http::request::Parts};

use crate::{
    error::AppError,
    services::auth_service::AdminPrincipal,
    state::AppState,
};

/// Extractor for routes that require a valid admin bearer token.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AdminPrincipal);

impl AdminUser {
    pub fn email(&self) -> &str {
        &self.0.email
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = bearer_token(auth_str)
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        let principal = state.gate.verify(token)?;
        Ok(AdminUser(principal))
    }
}
