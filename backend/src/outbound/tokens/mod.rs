//! HS256 JSON Web Token implementation of the token service port.
//!
//! `sub` carries the purpose and a private `id` claim carries the subject.
//! Expiry is checked against the injected clock rather than the library's
//! wall-clock check so tests can move time.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::ports::{TokenClaims, TokenError, TokenPurpose, TokenService};

const RESERVED_CLAIMS: [&str; 5] = ["iss", "sub", "id", "iat", "exp"];

/// Default lifetimes per purpose. Verification tokens never expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    /// Password-reset tokens.
    pub password: TimeDelta,
    /// Session tokens.
    pub session: TimeDelta,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            password: TimeDelta::hours(24),
            session: TimeDelta::hours(2),
        }
    }
}

impl TokenLifetimes {
    fn for_purpose(self, purpose: TokenPurpose) -> Option<TimeDelta> {
        match purpose {
            TokenPurpose::Verification => None,
            TokenPurpose::Password => Some(self.password),
            TokenPurpose::Authentication => Some(self.session),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    iss: String,
    sub: String,
    id: Uuid,
    iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Token service signing with a shared secret.
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    lifetimes: TokenLifetimes,
    clock: Arc<dyn Clock>,
}

impl JwtTokenService {
    /// Build a service for `issuer`. An empty secret is rejected.
    pub fn new(
        secret: &Zeroizing<String>,
        issuer: impl Into<String>,
        lifetimes: TokenLifetimes,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::signing("token secret must not be empty"));
        }
        let bytes = secret.as_bytes();
        Ok(Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            issuer: issuer.into(),
            lifetimes,
            clock,
        })
    }

    fn validation(&self, expected: TokenPurpose) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.sub = Some(expected.as_str().to_owned());
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["iss", "sub"]);
        validation
    }
}

fn timestamp(seconds: i64) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| TokenError::invalid(format!("timestamp {seconds} out of range")))
}

impl TokenService for JwtTokenService {
    fn issue(
        &self,
        subject_id: Uuid,
        purpose: TokenPurpose,
        mut extra: Map<String, Value>,
        ttl: Option<TimeDelta>,
    ) -> Result<String, TokenError> {
        extra.retain(|key, _| !RESERVED_CLAIMS.contains(&key.as_str()));
        let now = self.clock.utc();
        let exp = ttl
            .or_else(|| self.lifetimes.for_purpose(purpose))
            .map(|lifetime| (now + lifetime).timestamp());
        let claims = WireClaims {
            iss: self.issuer.clone(),
            sub: purpose.as_str().to_owned(),
            id: subject_id,
            iat: now.timestamp(),
            exp,
            extra,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| TokenError::signing(err.to_string()))
    }

    fn verify(&self, token: &str, expected: TokenPurpose) -> Result<TokenClaims, TokenError> {
        let data = decode::<WireClaims>(token, &self.decoding, &self.validation(expected))
            .map_err(|err| {
                debug!(purpose = %expected, error = %err, "token failed validation");
                TokenError::invalid(err.to_string())
            })?;
        let claims = data.claims;
        if claims
            .exp
            .is_some_and(|exp| self.clock.utc().timestamp() >= exp)
        {
            return Err(TokenError::expired());
        }
        Ok(TokenClaims {
            subject_id: claims.id,
            purpose: expected,
            issued_at: timestamp(claims.iat)?,
            expires_at: claims.exp.map(timestamp).transpose()?,
            issuer: claims.iss,
            extra: claims.extra,
        })
    }
}
