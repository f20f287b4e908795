use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::actor::{Actor, Role};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: String,
    #[serde(default)]
    pub school_id: Option<Uuid>,
}

impl TryFrom<Claims> for Actor {
    type Error = Error;

    fn try_from(claims: Claims) -> Result<Self> {
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| Error::Unauthorized("Token subject is not a user id".into()))?;
        let role: Role = claims.role.parse()?;
        Ok(Actor::new(id, role, claims.school_id))
    }
}

/// Signs an HS256 token for `actor` that expires `ttl_secs` from now.
pub fn issue_token(secret: &str, actor: &Actor, ttl_secs: i64) -> Result<String> {
    let exp = (chrono::Utc::now().timestamp() + ttl_secs).max(0) as usize;
    let role = serde_json::to_value(actor.role)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Internal("role did not serialize to a string".into()))?;
    let claims = Claims {
        sub: actor.id.to_string(),
        exp,
        role,
        school_id: actor.school_id,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("failed to sign token: {}", e)))
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

/// Decodes the bearer token and stores the caller as an `Actor` request extension.
pub async fn require_actor(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return unauthorized("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("unsupported_scheme");
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let claims = match decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            return unauthorized("invalid_token");
        }
    };

    match Actor::try_from(claims) {
        Ok(actor) => {
            req.extensions_mut().insert(actor);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips_into_actor() {
        let actor = Actor::new(Uuid::new_v4(), Role::SchoolAdmin, Some(Uuid::new_v4()));
        let token = issue_token("secret", &actor, 60).unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(data.claims.role, "school_admin");
        assert_eq!(Actor::try_from(data.claims).unwrap(), actor);
    }

    #[test]
    fn unknown_role_is_unauthorized() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: 0,
            role: "janitor".into(),
            school_id: None,
        };
        assert!(matches!(Actor::try_from(claims), Err(Error::Unauthorized(_))));
    }
}
