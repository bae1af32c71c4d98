//! Port for signing and verifying purpose-scoped tokens.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::Error;

use super::define_port_error;

/// What a token may be used for. Checked on every verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    /// Email ownership confirmation.
    Verification,
    /// Password reset.
    Password,
    /// Session.
    Authentication,
}

impl TokenPurpose {
    /// Claim value stored in `sub`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verification => "verification",
            Self::Password => "password",
            Self::Authentication => "authentication",
        }
    }

    /// Copy used when a token of this purpose is rejected.
    pub const fn rejection_message(self, expired: bool) -> &'static str {
        match (self, expired) {
            (Self::Verification, true) => "Verification link has expired",
            (Self::Verification, false) => "Verification link is invalid",
            (Self::Password, true) => "Password reset link has expired",
            (Self::Password, false) => "Password reset link is invalid",
            (Self::Authentication, true) => "Session has expired, please sign in again",
            (Self::Authentication, false) => "Invalid session token",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified token contents.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    /// Subject the token was issued for.
    pub subject_id: Uuid,
    /// Verified purpose.
    pub purpose: TokenPurpose,
    /// Issue time.
    pub issued_at: DateTime<Utc>,
    /// Expiry; `None` means valid until consumed.
    pub expires_at: Option<DateTime<Utc>>,
    /// Issuer that signed the token.
    pub issuer: String,
    /// Additional claims, such as `resetStamp`.
    pub extra: Map<String, Value>,
}

define_port_error! {
    /// Errors raised by token services.
    pub enum TokenError {
        /// The embedded expiry has passed.
        Expired => "token has expired",
        /// Signature, issuer, purpose or encoding is wrong.
        Invalid { message: String } => "token is invalid: {message}",
        /// The token could not be produced.
        Signing { message: String } => "token could not be signed: {message}",
    }
}

/// Signs and verifies purpose-scoped tokens.
#[cfg_attr(test, mockall::automock)]
pub trait TokenService: Send + Sync {
    /// Sign a token for `subject_id`.
    ///
    /// `ttl` overrides the purpose's default lifetime.
    fn issue(
        &self,
        subject_id: Uuid,
        purpose: TokenPurpose,
        extra: Map<String, Value>,
        ttl: Option<TimeDelta>,
    ) -> Result<String, TokenError>;

    /// Verify `token` for `expected` purpose.
    fn verify(&self, token: &str, expected: TokenPurpose) -> Result<TokenClaims, TokenError>;
}

/// Normalise a verification failure into an `Unauthorized` error.
pub(crate) fn map_token_error(purpose: TokenPurpose, error: TokenError) -> Error {
    match error {
        TokenError::Expired => Error::unauthorized(purpose.rejection_message(true))
            .with_sub_code("token_expired"),
        TokenError::Invalid { .. } => Error::unauthorized(purpose.rejection_message(false))
            .with_sub_code("token_invalid"),
        TokenError::Signing { message } => Error::internal(format!("token signing failed: {message}")),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(TokenPurpose::Verification, TokenError::expired(), "Verification link has expired")]
    #[case(TokenPurpose::Password, TokenError::invalid("bad sig"), "Password reset link is invalid")]
    #[case(TokenPurpose::Authentication, TokenError::invalid("wrong sub"), "Invalid session token")]
    fn verification_failures_are_unauthorized_with_purpose_copy(
        #[case] purpose: TokenPurpose,
        #[case] error: TokenError,
        #[case] message: &str,
    ) {
        let err = map_token_error(purpose, error);
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.message(), message);
    }

    #[rstest]
    fn signing_failures_are_internal() {
        let err = map_token_error(TokenPurpose::Password, TokenError::signing("no key"));
        assert_eq!(err.code(), ErrorCode::InternalError);
    }
}
