use super::{Actor, Role};
use crate::error::{PostboardError, PostboardResult};
use anyhow::{bail, Result};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

const MIN_SECRET_LEN: usize = 32;

/// Payload carried by issued bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub role: String,
    pub iat: u64,
    pub exp: u64,
}

/// Issues and verifies HS256 bearer tokens. Verification is pure: the
/// embedded identity is trusted for the rest of the request without a
/// store lookup.
#[derive(Clone)]
pub struct ClaimVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl ClaimVerifier {
    pub fn new(secret: &str, ttl_secs: u64) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            bail!("JWT secret must be at least {MIN_SECRET_LEN} bytes");
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = ["exp".to_string()].into_iter().collect();
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        })
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn issue(&self, user_id: i64, role: Role) -> PostboardResult<String> {
        let now = unix_now()?;
        self.encode_claims(&Claims {
            user_id,
            role: role.as_str().to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        })
    }

    fn encode_claims(&self, claims: &Claims) -> PostboardResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|err| PostboardError::Internal(anyhow::anyhow!("failed to sign token: {err}")))
    }

    /// Verifies a raw bearer token and extracts the actor it names.
    pub fn verify(&self, token: &str) -> PostboardResult<Actor> {
        let token = token.trim();
        if token.is_empty() {
            return Err(PostboardError::Unauthenticated(
                "authentication required".into(),
            ));
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            let reason = match err.kind() {
                ErrorKind::ExpiredSignature => "token expired",
                ErrorKind::InvalidSignature => "invalid signature",
                _ => "invalid token",
            };
            PostboardError::Unauthenticated(reason.into())
        })?;

        let role = data
            .claims
            .role
            .parse::<Role>()
            .map_err(|_| PostboardError::Unauthenticated("token carries unknown role".into()))?;
        Ok(Actor::new(data.claims.user_id, role))
    }

    /// Verifies the value of an `Authorization` header (`Bearer <token>`).
    pub fn verify_header(&self, header: Option<&str>) -> PostboardResult<Actor> {
        let token = header
            .and_then(|value| value.split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token)
            .ok_or_else(|| PostboardError::Unauthenticated("authentication required".into()))?;
        self.verify(token)
    }
}

fn unix_now() -> PostboardResult<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|err| PostboardError::Internal(anyhow::anyhow!("system time error: {err}")))
}
