use axum::async_trait;
use axum::extract::FromRef;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use clap::ValueEnum;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum AuthMode {
    /// Trusted backend (the web app's server side) calling on behalf of users.
    ApiKey,
    /// End-user bearer tokens issued by the identity provider.
    Jwt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum JwtAlgorithm {
    Hs256,
    Hs384,
    Hs512,
    Rs256,
    Es256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtKeyKind {
    Secret,
    Rsa,
    Ec,
}

impl JwtAlgorithm {
    pub fn key_kind(&self) -> JwtKeyKind {
        match self {
            JwtAlgorithm::Hs256 | JwtAlgorithm::Hs384 | JwtAlgorithm::Hs512 => JwtKeyKind::Secret,
            JwtAlgorithm::Rs256 => JwtKeyKind::Rsa,
            JwtAlgorithm::Es256 => JwtKeyKind::Ec,
        }
    }

    fn algorithm(&self) -> Algorithm {
        match self {
            JwtAlgorithm::Hs256 => Algorithm::HS256,
            JwtAlgorithm::Hs384 => Algorithm::HS384,
            JwtAlgorithm::Hs512 => Algorithm::HS512,
            JwtAlgorithm::Rs256 => Algorithm::RS256,
            JwtAlgorithm::Es256 => Algorithm::ES256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub api_key: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_public_key: Option<String>,
    pub jwt_algorithm: JwtAlgorithm,
}

impl AuthConfig {
    pub fn api_key(key: &str) -> Self {
        Self {
            mode: AuthMode::ApiKey,
            api_key: Some(key.to_string()),
            jwt_secret: None,
            jwt_public_key: None,
            jwt_algorithm: JwtAlgorithm::Hs256,
        }
    }

    fn decoding_key(&self) -> Result<DecodingKey, ApiError> {
        match self.jwt_algorithm.key_kind() {
            JwtKeyKind::Secret => {
                let secret = self
                    .jwt_secret
                    .as_deref()
                    .ok_or_else(|| ApiError::Unauthorized("missing JWT_SECRET".into()))?;
                Ok(DecodingKey::from_secret(secret.as_bytes()))
            }
            kind => {
                let pem = self
                    .jwt_public_key
                    .as_deref()
                    .ok_or_else(|| ApiError::Unauthorized("missing JWT_PUBLIC_KEY".into()))?;
                let key = if kind == JwtKeyKind::Rsa {
                    DecodingKey::from_rsa_pem(pem.as_bytes())
                } else {
                    DecodingKey::from_ec_pem(pem.as_bytes())
                };
                key.map_err(|err| ApiError::Unauthorized(format!("invalid JWT_PUBLIC_KEY: {err}")))
            }
        }
    }
}

/// Who is calling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// API-key caller; must name the user it acts for.
    Service,
    User { user_id: Uuid, email: Option<String> },
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal: Principal,
}

impl AuthUser {
    /// The user an operation runs as. Token holders may only act as
    /// themselves; service callers must say who they act for.
    pub fn acting_user(&self, requested: Option<Uuid>) -> Result<Uuid, ApiError> {
        match (&self.principal, requested) {
            (Principal::Service, Some(user_id)) => Ok(user_id),
            (Principal::Service, None) => Err(ApiError::BadRequest("user_id is required".into())),
            (Principal::User { user_id, .. }, Some(requested)) if requested != *user_id => Err(
                ApiError::Forbidden(format!("token for {user_id} cannot act as {requested}")),
            ),
            (Principal::User { user_id, .. }, _) => Ok(*user_id),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[allow(dead_code)]
    exp: Option<usize>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AuthConfig::from_ref(state);

        match config.mode {
            AuthMode::ApiKey => authorize_api_key(&parts.headers, &config),
            AuthMode::Jwt => {
                let token = bearer_token(&parts.headers)?
                    .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".into()))?;
                let (user_id, email) = decode_user_token(token, &config)?;
                Ok(AuthUser {
                    principal: Principal::User { user_id, email },
                })
            }
        }
    }
}

pub fn authorize_api_key(headers: &HeaderMap, config: &AuthConfig) -> Result<AuthUser, ApiError> {
    let expected = config
        .api_key
        .as_deref()
        .ok_or_else(|| ApiError::Unauthorized("missing BS_API_KEY".into()))?;

    let provided = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing X-API-Key header".into()))?;

    if provided != expected {
        return Err(ApiError::Unauthorized("invalid API key".into()));
    }

    Ok(AuthUser {
        principal: Principal::Service,
    })
}

/// `None` when no Authorization header was sent at all.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("malformed Authorization header".into()))?;
    header
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or_else(|| ApiError::Unauthorized("expected Bearer token".into()))
}

/// Validates an identity token and returns its subject and e-mail claim.
pub fn decode_user_token(
    token: &str,
    config: &AuthConfig,
) -> Result<(Uuid, Option<String>), ApiError> {
    let key = config.decoding_key()?;
    let validation = Validation::new(config.jwt_algorithm.algorithm());

    let data = decode::<Claims>(token, &key, &validation)
        .map_err(|err| ApiError::Unauthorized(format!("invalid token: {err}")))?;
    let user_id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| ApiError::Unauthorized("token subject is not a user id".into()))?;

    Ok((user_id, data.claims.email))
}
