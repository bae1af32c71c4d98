//! Authentication primitives: sign-up payloads, credentials and outcomes.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to the auth service.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use zeroize::Zeroizing;

use super::Error;
use super::entity::{EntityField, FieldErrors};
use super::user::{Email, NAME_LENGTH, UserField};

/// Minimum accepted length for a new password.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum accepted length for a new password.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Validate the length of a plain-text password destined for hashing.
pub(crate) fn check_new_password(password: &str, errors: &mut FieldErrors) {
    let length = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        errors.add(
            UserField::Password,
            format!(
                "password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"
            ),
        );
    }
}

/// Validated sign-in credentials.
///
/// ## Invariants
/// - `email` is normalised.
/// - `password` is non-empty and keeps caller-provided whitespace.
///
/// # Examples
/// ```
/// use research_backend::domain::Credentials;
///
/// let creds = Credentials::try_from_parts("Ada@Example.com", "secret123").expect("valid");
/// assert_eq!(creds.email().as_ref(), "ada@example.com");
/// assert_eq!(creds.password(), "secret123");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: Email,
    password: Zeroizing<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Construct credentials from raw inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, Error> {
        let mut errors = FieldErrors::default();
        let parsed = Email::parse(email)
            .map_err(|_| errors.add(UserField::Email, "email must be a valid address"))
            .ok();
        if password.is_empty() {
            errors.add(UserField::Password, "password is required");
        }
        errors.into_result(())?;
        let email = parsed.ok_or_else(|| Error::internal("email validation lost its value"))?;
        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email address.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Plain-text password.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Validated sign-up request.
#[derive(Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    first_name: String,
    last_name: String,
    email: Email,
    password: Zeroizing<String>,
    photo: Option<String>,
}

impl fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("photo", &self.photo)
            .finish()
    }
}

impl SignUpRequest {
    /// Validate every sign-up field, reporting all failures at once.
    ///
    /// # Examples
    /// ```
    /// use research_backend::domain::SignUpRequest;
    ///
    /// let err = SignUpRequest::try_from_parts("", "Lovelace", "nope", "short", None)
    ///     .expect_err("three invalid fields");
    /// assert_eq!(err.field_errors().map(|fields| fields.len()), Some(3));
    /// ```
    pub fn try_from_parts(
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
        photo: Option<&str>,
    ) -> Result<Self, Error> {
        let mut errors = FieldErrors::default();
        for (field, value) in [
            (UserField::FirstName, first_name),
            (UserField::LastName, last_name),
        ] {
            let length = value.trim().chars().count();
            let (min, max) = NAME_LENGTH;
            if length < min || length > max {
                errors.add(
                    field,
                    format!("{} must be between {min} and {max} characters", field.name()),
                );
            }
        }
        let parsed = Email::parse(email)
            .map_err(|_| errors.add(UserField::Email, "email must be a valid address"))
            .ok();
        check_new_password(password, &mut errors);
        errors.into_result(())?;
        let email = parsed.ok_or_else(|| Error::internal("email validation lost its value"))?;
        Ok(Self {
            first_name: first_name.trim().to_owned(),
            last_name: last_name.trim().to_owned(),
            email,
            password: Zeroizing::new(password.to_owned()),
            photo: photo.map(str::trim).filter(|url| !url.is_empty()).map(str::to_owned),
        })
    }

    /// Given name.
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Family name.
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Normalised email address.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Plain-text password, hashed before persistence.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Avatar location.
    pub fn photo(&self) -> Option<&str> {
        self.photo.as_deref()
    }
}

/// Result category of a sign-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInStatus {
    /// Unknown email or wrong password.
    Invalid,
    /// Correct account, email not yet confirmed.
    Unverified,
    /// Credentials accepted; a session token was issued.
    Authenticated,
}

impl SignInStatus {
    /// Copy shown to the caller.
    pub const fn message(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid email or password",
            Self::Unverified => "Please verify your email address before signing in",
            Self::Authenticated => "Signed in successfully",
        }
    }
}

/// Sign-in outcome. `token` is present only for [`SignInStatus::Authenticated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignInOutcome {
    /// Outcome category.
    pub status: SignInStatus,
    /// Caller-facing message.
    pub message: String,
    /// Session token on success.
    pub token: Option<String>,
}

impl SignInOutcome {
    pub(crate) fn rejected(status: SignInStatus) -> Self {
        Self {
            status,
            message: status.message().to_owned(),
            token: None,
        }
    }

    pub(crate) fn authenticated(token: String) -> Self {
        Self {
            status: SignInStatus::Authenticated,
            message: SignInStatus::Authenticated.message().to_owned(),
            token: Some(token),
        }
    }
}

/// Sign-up outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpOutcome {
    /// Public representation of the new account.
    pub user: Map<String, Value>,
    /// Whether the verification email reached the notifier.
    pub email_dispatched: bool,
}

/// Password-reset request outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetLinkOutcome {
    /// Whether the reset email reached the notifier.
    pub email_dispatched: bool,
}
