//! Identity middleware
//!
//! Tokens are issued by the external auth service; this core only verifies
//! them and extracts the typed identity. Role and verification claims are
//! trusted as-is — the creation transaction re-checks the student's verified
//! flag against the database before committing an order.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::error::{AppError, ErrorCode};
use shared::types::Role;

use crate::state::AppState;

/// JWT claims issued by the external auth service
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// User id
    pub sub: Uuid,
    /// Actor role
    pub role: Role,
    /// Restaurant binding (restaurant staff only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<Uuid>,
    /// Student email-verification flag
    #[serde(default)]
    pub verified: bool,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated identity extracted from the JWT
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
    pub restaurant_id: Option<Uuid>,
    pub verified: bool,
}

impl Identity {
    /// Require a specific role
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::with_message(
                ErrorCode::RoleRequired,
                format!("{} role required", role),
            ))
        }
    }

    /// Require restaurant staff and return their restaurant binding
    pub fn require_restaurant(&self) -> Result<Uuid, AppError> {
        self.require_role(Role::Restaurant)?;
        self.restaurant_id.ok_or_else(|| {
            AppError::with_message(
                ErrorCode::PermissionDenied,
                "Restaurant account has no restaurant binding",
            )
        })
    }
}

const TOKEN_EXPIRY_HOURS: i64 = 24;

/// Create an identity token
///
/// Issuance lives in the external auth service; mirrored here for tests and
/// local tooling.
#[allow(dead_code)]
pub fn create_token(
    user_id: Uuid,
    role: Role,
    restaurant_id: Option<Uuid>,
    verified: bool,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = IdentityClaims {
        sub: user_id,
        role,
        restaurant_id,
        verified,
        exp: (now + chrono::Duration::hours(TOKEN_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Middleware that extracts and verifies the identity JWT from the
/// Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::new(ErrorCode::NotAuthenticated))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::new(ErrorCode::TokenInvalid))?;

    let validation = Validation::default();
    let token_data = jsonwebtoken::decode::<IdentityClaims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(ErrorCode::TokenExpired)
            }
            _ => AppError::new(ErrorCode::TokenInvalid),
        }
    })?;

    let identity = Identity {
        user_id: token_data.claims.sub,
        role: token_data.claims.role,
        restaurant_id: token_data.claims.restaurant_id,
        verified: token_data.claims.verified,
    };

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip_preserves_claims() {
        let secret = "test-secret";
        let user = Uuid::new_v4();
        let restaurant = Uuid::new_v4();
        let token =
            create_token(user, Role::Restaurant, Some(restaurant), false, secret).unwrap();

        let decoded = jsonwebtoken::decode::<IdentityClaims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, user);
        assert_eq!(decoded.claims.role, Role::Restaurant);
        assert_eq!(decoded.claims.restaurant_id, Some(restaurant));
    }

    #[test]
    fn role_guards() {
        let identity = Identity {
            user_id: Uuid::new_v4(),
            role: Role::Student,
            restaurant_id: None,
            verified: true,
        };

        assert!(identity.require_role(Role::Student).is_ok());
        assert!(identity.require_role(Role::SuperAdmin).is_err());
        assert!(identity.require_restaurant().is_err());
    }
}
