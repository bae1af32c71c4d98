//! User identity record and its persisted fields.
//!
//! Purpose: model the account lifecycle (`isVerified`, `resetStamp`) and keep
//! credential material out of every externally observable representation.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Error;
use super::entity::{
    Entity, EntityField, FieldErrors, FieldMap, FieldValue, bounded_text, text_field,
};

/// Length bounds for first and last names.
pub const NAME_LENGTH: (usize, usize) = (1, 50);

/// Columns of the `users` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserField {
    /// Primary key.
    Id,
    /// Given name.
    FirstName,
    /// Family name.
    LastName,
    /// Unique, lower-cased address.
    Email,
    /// Stored password hash.
    Password,
    /// Optional avatar location.
    Photo,
    /// Optional persistent-login token.
    RememberMeToken,
    /// Reset ticket; 0 means none outstanding.
    ResetStamp,
    /// Administrative privilege.
    IsAdmin,
    /// Email ownership confirmed.
    IsVerified,
    /// Creation time.
    CreatedAt,
    /// Last modification time.
    UpdatedAt,
}

impl EntityField for UserField {
    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::Password => "password",
            Self::Photo => "photo",
            Self::RememberMeToken => "rememberMeToken",
            Self::ResetStamp => "resetStamp",
            Self::IsAdmin => "isAdmin",
            Self::IsVerified => "isVerified",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }
}

/// Validated, lower-cased email address.
///
/// # Examples
/// ```
/// use research_backend::domain::Email;
///
/// let email = Email::parse(" Ada@Example.COM ").expect("valid email");
/// assert_eq!(email.as_ref(), "ada@example.com");
/// assert!(Email::parse("no-at-sign").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Normalise and validate an address.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let normalized = raw.trim().to_lowercase();
        let valid = normalized
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !domain.contains('@')
            })
            && !normalized.chars().any(char::is_whitespace)
            && normalized.len() <= 254;
        if valid {
            Ok(Self(normalized))
        } else {
            Err(Error::invalid_field(
                UserField::Email.name(),
                "email must be a valid address",
            ))
        }
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application account.
///
/// ## Invariants
/// - `email` is lower-cased and unique.
/// - `password` holds a hash, never plain text.
/// - `reset_stamp` is 0 or the epoch-millisecond time of the outstanding
///   reset request.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: Email,
    password: String,
    photo: Option<String>,
    remember_me_token: Option<String>,
    reset_stamp: i64,
    is_admin: bool,
    is_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("photo", &self.photo)
            .field(
                "remember_me_token",
                &self.remember_me_token.as_ref().map(|_| "<redacted>"),
            )
            .field("reset_stamp", &"<redacted>")
            .field("is_admin", &self.is_admin)
            .field("is_verified", &self.is_verified)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl User {
    /// Account identifier.
    pub fn id(&self) -> Uuid {
        self.id
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

    /// Stored password hash.
    pub fn password_hash(&self) -> &str {
        &self.password
    }

    /// Avatar location.
    pub fn photo(&self) -> Option<&str> {
        self.photo.as_deref()
    }

    /// Persistent-login token.
    pub fn remember_me_token(&self) -> Option<&str> {
        self.remember_me_token.as_deref()
    }

    /// Outstanding reset ticket, 0 when none.
    pub fn reset_stamp(&self) -> i64 {
        self.reset_stamp
    }

    /// Whether the account has administrative privilege.
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Whether the email address has been confirmed.
    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification time.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Rebuild a user from storage without re-validating.
    #[expect(clippy::too_many_arguments, reason = "mirrors the users table row")]
    pub(crate) fn from_storage(
        id: Uuid,
        first_name: String,
        last_name: String,
        email: String,
        password: String,
        photo: Option<String>,
        remember_me_token: Option<String>,
        reset_stamp: i64,
        is_admin: bool,
        is_verified: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            first_name,
            last_name,
            email: Email(email),
            password,
            photo,
            remember_me_token,
            reset_stamp,
            is_admin,
            is_verified,
            created_at,
            updated_at,
        }
    }

    fn apply(mut self, fields: &FieldMap<UserField>, errors: &mut FieldErrors) -> Self {
        for (field, value) in fields {
            match field {
                UserField::FirstName => {
                    self.first_name = bounded_text(fields, *field, NAME_LENGTH, errors);
                }
                UserField::LastName => {
                    self.last_name = bounded_text(fields, *field, NAME_LENGTH, errors);
                }
                UserField::Email => match value.as_text().map(Email::parse) {
                    Some(Ok(email)) => self.email = email,
                    _ => errors.add(*field, "email must be a valid address"),
                },
                UserField::Password => match value.as_text().filter(|hash| !hash.is_empty()) {
                    Some(hash) => hash.clone_into(&mut self.password),
                    None => errors.add(*field, "password is required"),
                },
                UserField::Photo => self.photo = text_field(fields, *field, errors),
                UserField::RememberMeToken => {
                    self.remember_me_token = text_field(fields, *field, errors);
                }
                UserField::ResetStamp => match value.as_integer() {
                    Some(stamp) if stamp >= 0 => self.reset_stamp = stamp,
                    _ => errors.add(*field, "resetStamp must be a non-negative integer"),
                },
                UserField::IsAdmin => match value.as_bool() {
                    Some(flag) => self.is_admin = flag,
                    None => errors.add(*field, "isAdmin must be a boolean"),
                },
                UserField::IsVerified => match value.as_bool() {
                    Some(flag) => self.is_verified = flag,
                    None => errors.add(*field, "isVerified must be a boolean"),
                },
                UserField::Id | UserField::CreatedAt | UserField::UpdatedAt => {}
            }
        }
        self
    }
}

impl Entity for User {
    type Field = UserField;

    const NAME: &'static str = "User";
    const ID_FIELD: UserField = UserField::Id;
    const FIELDS: &'static [UserField] = &[
        UserField::Id,
        UserField::FirstName,
        UserField::LastName,
        UserField::Email,
        UserField::Password,
        UserField::Photo,
        UserField::RememberMeToken,
        UserField::ResetStamp,
        UserField::IsAdmin,
        UserField::IsVerified,
        UserField::CreatedAt,
        UserField::UpdatedAt,
    ];
    const FILLABLE: &'static [UserField] = &[
        UserField::FirstName,
        UserField::LastName,
        UserField::Email,
        UserField::Password,
        UserField::Photo,
    ];
    const HIDDEN: &'static [UserField] = &[UserField::Password, UserField::ResetStamp];

    fn id(&self) -> Uuid {
        self.id
    }

    fn value(&self, field: UserField) -> FieldValue {
        match field {
            UserField::Id => self.id.into(),
            UserField::FirstName => self.first_name.clone().into(),
            UserField::LastName => self.last_name.clone().into(),
            UserField::Email => self.email.0.clone().into(),
            UserField::Password => self.password.clone().into(),
            UserField::Photo => self.photo.clone().into(),
            UserField::RememberMeToken => self.remember_me_token.clone().into(),
            UserField::ResetStamp => self.reset_stamp.into(),
            UserField::IsAdmin => self.is_admin.into(),
            UserField::IsVerified => self.is_verified.into(),
            UserField::CreatedAt => self.created_at.into(),
            UserField::UpdatedAt => self.updated_at.into(),
        }
    }

    fn hydrate(id: Uuid, fields: &FieldMap<UserField>, now: DateTime<Utc>) -> Result<Self, Error> {
        let mut errors = FieldErrors::default();
        for required in [
            UserField::FirstName,
            UserField::LastName,
            UserField::Email,
            UserField::Password,
        ] {
            if fields.get(&required).is_none_or(FieldValue::is_null) {
                errors.add(required, format!("{} is required", required.name()));
            }
        }
        let blank = Self {
            id,
            first_name: String::new(),
            last_name: String::new(),
            email: Email(String::new()),
            password: String::new(),
            photo: None,
            remember_me_token: None,
            reset_stamp: 0,
            is_admin: false,
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        let user = blank.apply(fields, &mut errors);
        errors.into_result(user)
    }

    fn merge(&self, patch: &FieldMap<UserField>, now: DateTime<Utc>) -> Result<Self, Error> {
        let mut errors = FieldErrors::default();
        let mut merged = self.clone().apply(patch, &mut errors);
        merged.updated_at = now;
        errors.into_result(merged)
    }
}
