//! Bearer-token guard for the REST API.
//!
//! Tokens are HS256 JWTs issued by the identity provider in front of the
//! back office. The middleware validates the signature and expiry and stores
//! the claims in request extensions for the [`AuthUser`] extractor.

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Claims carried by back-office access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Subject (employee or customer id)
    pub sub: String,
    /// ADMIN, CASHIER, TECHNICIAN or CUSTOMER
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

/// HS256 verifier shared across requests.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl JwtVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;
        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            validation: Arc::new(validation),
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthClaims, AppError> {
        let data = decode::<AuthClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

/// Sign claims with the shared secret. Used by tooling and tests.
pub fn issue_token(secret: &[u8], claims: &AuthClaims) -> Result<String, AppError> {
    Ok(encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )?)
}

/// Reject requests without a valid `Authorization: Bearer` token.
pub async fn jwt_auth_middleware(
    State(verifier): State<JwtVerifier>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = verifier.verify(token)?;

    tracing::Span::current().record("user_id", claims.sub.as_str());
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor for the authenticated caller.
pub struct AuthUser(pub AuthClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthClaims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Not authenticated")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp: usize) -> AuthClaims {
        AuthClaims {
            sub: "cashier-7".to_string(),
            role: Some("CASHIER".to_string()),
            exp,
        }
    }

    fn far_future() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn test_issue_and_verify() {
        let secret = b"test-secret";
        let token = issue_token(secret, &claims(far_future())).unwrap();

        let verified = JwtVerifier::new(secret).verify(&token).unwrap();
        assert_eq!(verified.sub, "cashier-7");
        assert_eq!(verified.role.as_deref(), Some("CASHIER"));
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let token = issue_token(b"one", &claims(far_future())).unwrap();
        let result = JwtVerifier::new(b"two").verify(&token);
        assert!(matches!(result, Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn test_rejects_expired_token() {
        let expired = (chrono::Utc::now().timestamp() - 3600) as usize;
        let token = issue_token(b"secret", &claims(expired)).unwrap();
        assert!(JwtVerifier::new(b"secret").verify(&token).is_err());
    }
}
