//! Authentication extractor.
//!
//! Every `/api` route requires a bearer token signed with the configured HS256 secret. The
//! token carries the employee id and role; the role decides what the employee may do with a
//! document (see `boukir_core::access`).

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, Validation};
use serde::{Deserialize, Serialize};

use boukir_core::{Actor, Role, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// Claims of an employee token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Employee id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Role label, e.g. `PDG` or `ChefChauffeur`.
    pub role: String,
    /// Expiration (seconds since the epoch).
    pub exp: u64,
}

/// An authenticated employee.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The acting employee.
    pub actor: Actor,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let auth_header = parts
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or(ApiError::Unauthorized)?;

            let claims = validate_jwt(token, state)?;

            Ok(AuthUser {
                actor: actor_from_claims(claims),
            })
        })
    }
}

fn validate_jwt(token: &str, state: &AppState) -> Result<Claims, ApiError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &state.jwt_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            ApiError::Unauthorized
        })
}

/// Ids that are not positive are treated as absent.
fn actor_from_claims(claims: Claims) -> Actor {
    let user_id = claims.id.filter(|id| *id > 0).map(UserId::new);
    Actor::new(user_id, Role::from(claims.role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_become_an_actor() {
        let actor = actor_from_claims(Claims {
            id: Some(7),
            role: "ChefChauffeur".into(),
            exp: 0,
        });
        assert_eq!(actor.user_id, Some(UserId::new(7)));
        assert!(actor.is_driver());

        let anonymous = actor_from_claims(Claims {
            id: Some(0),
            role: "PDG".into(),
            exp: 0,
        });
        assert_eq!(anonymous.user_id, None);
        assert_eq!(anonymous.role, Role::Pdg);
    }
}
