//! Account lifecycle: sign-up, sign-in, verification, password reset and
//! session checks.
//!
//! `User.isVerified` moves from false to true only through
//! [`AuthService::account_verification`]. `User.resetStamp` is the single-use
//! ticket of the reset flow: requesting a link stamps it with the current
//! epoch-millisecond time (strictly increasing per user) and embeds the stamp
//! in the token; consuming a link compares the claim with the stored stamp and
//! clears it in the same guarded write.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use mockable::Clock;
use pagination::{PageParams, PageWindow, Paginated, PaginationLimits, PaginationMeta};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::auth::check_new_password;
use crate::domain::ports::{
    CredentialHasher, EmailMessage, Notifier, Precondition, Repository, SEARCH_SORT_FIELDS,
    SearchDocument, SearchIndex, TokenClaims, TokenPurpose, TokenService, map_search_error,
    map_token_error, verify_blocking,
};
use crate::domain::{
    AppLinks, Credentials, Criteria, Entity, Error, FieldErrors, FieldMap, FieldValue, FindQuery,
    ResetLinkOutcome, SignInOutcome, SignInStatus, SignUpOutcome, SignUpRequest, User, UserField,
};

/// Claim carrying the reset ticket inside password tokens.
pub const RESET_STAMP_CLAIM: &str = "resetStamp";

/// Default lifetime of password-reset links.
pub const DEFAULT_PASSWORD_RESET_TTL: TimeDelta = TimeDelta::hours(24);

/// Collaborators required by [`AuthService`].
#[derive(Clone)]
pub struct AuthPorts {
    /// User persistence; its adapter must hash passwords before persisting.
    pub users: Arc<dyn Repository<User>>,
    /// Password comparison.
    pub hasher: Arc<dyn CredentialHasher>,
    /// Token signing and verification.
    pub tokens: Arc<dyn TokenService>,
    /// Email delivery.
    pub notifier: Arc<dyn Notifier>,
    /// User search projection.
    pub search: Arc<dyn SearchIndex>,
    /// Time source for reset stamps.
    pub clock: Arc<dyn Clock>,
}

/// Authentication and credential lifecycle service.
#[derive(Clone)]
pub struct AuthService {
    ports: AuthPorts,
    links: AppLinks,
    limits: PaginationLimits,
    password_reset_ttl: TimeDelta,
}

impl AuthService {
    /// Create a service with default pagination limits and reset lifetime.
    pub fn new(ports: AuthPorts, links: AppLinks) -> Self {
        Self {
            ports,
            links,
            limits: PaginationLimits::default(),
            password_reset_ttl: DEFAULT_PASSWORD_RESET_TTL,
        }
    }

    /// Override the pagination limits used by [`AuthService::search`].
    #[must_use]
    pub fn with_limits(mut self, limits: PaginationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Override the lifetime of password-reset links.
    #[must_use]
    pub fn with_password_reset_ttl(mut self, ttl: TimeDelta) -> Self {
        self.password_reset_ttl = ttl;
        self
    }

    fn by_email(email: &str) -> Criteria<UserField> {
        Criteria::by(UserField::Email, email)
    }

    fn by_id(id: Uuid) -> Criteria<UserField> {
        Criteria::by(UserField::Id, id)
    }

    async fn dispatch(&self, to: &str, message: EmailMessage) -> bool {
        match self.ports.notifier.send_email(to, &message).await {
            Ok(()) => {
                debug!(template = %message.template, "notification dispatched");
                true
            }
            Err(err) => {
                warn!(template = %message.template, error = %err, "notification dispatch failed");
                false
            }
        }
    }

    /// Register a new, unverified account.
    ///
    /// Notifier and search index failures do not fail the request: the
    /// account exists either way. `email_dispatched` reports whether the
    /// verification email reached the notifier.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, Error> {
        let email = request.email().as_ref();
        self.ports
            .users
            .check_duplicate(&Self::by_email(email), "Email is already registered", None)
            .await?;

        let fields = FieldMap::from([
            (UserField::FirstName, FieldValue::from(request.first_name())),
            (UserField::LastName, FieldValue::from(request.last_name())),
            (UserField::Email, FieldValue::from(email)),
            (UserField::Password, FieldValue::from(request.password())),
            (UserField::Photo, FieldValue::from(request.photo())),
        ]);
        let user = self.ports.users.create(fields).await?;
        info!(user_id = %user.id(), "account created");

        let token = self
            .ports
            .tokens
            .issue(user.id(), TokenPurpose::Verification, Map::new(), None)
            .map_err(|err| map_token_error(TokenPurpose::Verification, err))?;
        let message = EmailMessage::new("Verify your email address", "account_verification")
            .with_field("firstName", user.first_name())
            .with_field("link", self.links.verification(&token));
        let email_dispatched = self.dispatch(user.email().as_ref(), message).await;

        if let Err(err) = self
            .ports
            .search
            .index_document(&SearchDocument::from(&user))
            .await
        {
            warn!(user_id = %user.id(), error = %err, "search indexing failed");
        }

        Ok(SignUpOutcome {
            user: user.to_public(),
            email_dispatched,
        })
    }

    /// Check credentials and issue a session token.
    ///
    /// Unknown email and wrong password share the `invalid` outcome; a known
    /// but unverified account yields `unverified` without checking the
    /// password. No token is issued on any failure path.
    pub async fn authentication(&self, credentials: &Credentials) -> Result<SignInOutcome, Error> {
        let Some(user) = self
            .ports
            .users
            .find_one(&Self::by_email(credentials.email().as_ref()))
            .await?
        else {
            debug!("sign-in for unknown email");
            return Ok(SignInOutcome::rejected(SignInStatus::Invalid));
        };
        if !user.is_verified() {
            debug!(user_id = %user.id(), "sign-in for unverified account");
            return Ok(SignInOutcome::rejected(SignInStatus::Unverified));
        }
        let matches = verify_blocking(
            Arc::clone(&self.ports.hasher),
            Zeroizing::new(credentials.password().to_owned()),
            user.password_hash().to_owned(),
        )
        .await?;
        if !matches {
            debug!(user_id = %user.id(), "sign-in with wrong password");
            return Ok(SignInOutcome::rejected(SignInStatus::Invalid));
        }
        let token = self
            .ports
            .tokens
            .issue(user.id(), TokenPurpose::Authentication, Map::new(), None)
            .map_err(|err| map_token_error(TokenPurpose::Authentication, err))?;
        info!(user_id = %user.id(), "signed in");
        Ok(SignInOutcome::authenticated(token))
    }

    /// Confirm email ownership.
    ///
    /// Fails with `NotFound` for a deleted account and `Conflict` when the
    /// account is already verified.
    pub async fn account_verification(&self, token: &str) -> Result<User, Error> {
        let claims = self.verify_token(token, TokenPurpose::Verification)?;
        let user = self
            .ports
            .users
            .find_one_or_fail(&Self::by_id(claims.subject_id), None)
            .await?;
        let guard = |current: &User| {
            if current.is_verified() {
                Err(Error::conflict("Account is already verified")
                    .with_sub_code("already_verified"))
            } else {
                Ok(())
            }
        };
        let patch = FieldMap::from([(UserField::IsVerified, FieldValue::from(true))]);
        let verified = self.ports.users.update(&user, patch, Some(&guard)).await?;
        info!(user_id = %verified.id(), "account verified");
        Ok(verified)
    }

    /// Resolve the account behind a session token.
    pub async fn check_authentication(&self, token: &str) -> Result<User, Error> {
        let claims = self.verify_token(token, TokenPurpose::Authentication)?;
        self.ports
            .users
            .find_one_or_fail(
                &Self::by_id(claims.subject_id),
                Some("Account no longer exists"),
            )
            .await
    }

    /// Fail with `Unauthorized` unless `user` is an administrator.
    pub fn require_admin(user: &User) -> Result<(), Error> {
        if user.is_admin() {
            Ok(())
        } else {
            Err(Error::unauthorized("Administrator privileges required")
                .with_sub_code("admin_required"))
        }
    }

    /// Stamp a new reset ticket and email a single-use reset link.
    ///
    /// Any previously issued link for the account stops working.
    pub async fn send_password_reset_link(&self, email: &str) -> Result<ResetLinkOutcome, Error> {
        let normalized = email.trim().to_lowercase();
        let user = self
            .ports
            .users
            .find_one_or_fail(
                &Self::by_email(&normalized),
                Some("No account is registered with this email"),
            )
            .await?;

        let now_ms = self.ports.clock.utc().timestamp_millis();
        let stamp = now_ms.max(user.reset_stamp().saturating_add(1));
        let patch = FieldMap::from([(UserField::ResetStamp, FieldValue::from(stamp))]);
        let user = self.ports.users.update(&user, patch, None).await?;

        let mut extra = Map::new();
        extra.insert(RESET_STAMP_CLAIM.to_owned(), json!(stamp));
        let token = self
            .ports
            .tokens
            .issue(
                user.id(),
                TokenPurpose::Password,
                extra,
                Some(self.password_reset_ttl),
            )
            .map_err(|err| map_token_error(TokenPurpose::Password, err))?;
        let message = EmailMessage::new("Reset your password", "password_reset")
            .with_field("firstName", user.first_name())
            .with_field("link", self.links.password_reset(&token));
        let email_dispatched = self.dispatch(user.email().as_ref(), message).await;
        info!(user_id = %user.id(), reset_stamp = stamp, "password reset requested");
        Ok(ResetLinkOutcome { email_dispatched })
    }

    /// Consume a reset link and set a new password.
    ///
    /// Checked against the stored account, in order: a cleared stamp means the
    /// link was already used; a different stamp means a newer link exists; an
    /// unchanged password is rejected.
    pub async fn update_password(&self, token: &str, new_password: &str) -> Result<User, Error> {
        let claims = self.verify_token(token, TokenPurpose::Password)?;
        let claimed_stamp = claims
            .extra
            .get(RESET_STAMP_CLAIM)
            .and_then(Value::as_i64)
            .filter(|stamp| *stamp > 0)
            .ok_or_else(|| {
                Error::unauthorized(TokenPurpose::Password.rejection_message(false))
                    .with_sub_code("token_invalid")
            })?;

        let mut errors = FieldErrors::default();
        check_new_password(new_password, &mut errors);
        errors.into_result(())?;

        let user = self
            .ports
            .users
            .find_one_or_fail(&Self::by_id(claims.subject_id), None)
            .await?;
        let guard = ResetGuard {
            claimed_stamp,
            new_password: Zeroizing::new(new_password.to_owned()),
            hasher: Arc::clone(&self.ports.hasher),
        };
        let patch = FieldMap::from([
            (UserField::Password, FieldValue::from(new_password)),
            (UserField::ResetStamp, FieldValue::from(0_i64)),
        ]);
        let updated = self.ports.users.update(&user, patch, Some(&guard)).await?;
        info!(user_id = %updated.id(), "password reset completed");
        Ok(updated)
    }

    /// Prefix search over user names, in the standard pagination envelope.
    pub async fn search(
        &self,
        term: &str,
        params: &PageParams,
    ) -> Result<Paginated<SearchDocument>, Error> {
        let request = params.resolve(&self.limits)?;
        if let Some(sort) = request.sort() {
            if !SEARCH_SORT_FIELDS.contains(&sort.field()) {
                return Err(Error::invalid_field(
                    "sort",
                    format!("cannot sort by unknown field {:?}", sort.field()),
                ));
            }
        }
        let hits = self
            .ports
            .search
            .search(term.trim(), request.window(), request.sort())
            .await
            .map_err(map_search_error)?;
        Ok(Paginated::new(
            hits.documents,
            PaginationMeta::new(hits.total, request.window()),
        ))
    }

    /// Rebuild the search projection from every stored account.
    ///
    /// Returns the number of documents indexed.
    pub async fn reindex_search(&self) -> Result<u64, Error> {
        let size = self.limits.max_items_per_page().to_string();
        let mut page = 1_u64;
        let mut indexed = 0_u64;
        loop {
            let window =
                PageWindow::compute(&self.limits, Some(size.as_str()), Some(&page.to_string()))?;
            let batch = self.ports.users.find(&FindQuery::new(window)).await?;
            for user in &batch.data {
                self.ports
                    .search
                    .index_document(&SearchDocument::from(user))
                    .await
                    .map_err(map_search_error)?;
                indexed += 1;
            }
            if page >= batch.pagination.total_page {
                break;
            }
            page += 1;
        }
        info!(indexed, "search index rebuilt");
        Ok(indexed)
    }

    fn verify_token(&self, token: &str, purpose: TokenPurpose) -> Result<TokenClaims, Error> {
        self.ports
            .tokens
            .verify(token.trim(), purpose)
            .map_err(|err| {
                debug!(purpose = %purpose, error = %err, "token rejected");
                map_token_error(purpose, err)
            })
    }
}

/// Reset-link failure raised when the stored stamp is already cleared.
pub fn reset_link_already_used() -> Error {
    Error::unauthorized("This password reset link has already been used")
        .with_sub_code("reset_link_already_used")
}

/// Reset-link failure raised when a newer link superseded this one.
pub fn reset_link_invalid() -> Error {
    Error::unauthorized("This password reset link is no longer valid")
        .with_sub_code("reset_link_invalid")
}

/// Validation failure raised when the new password equals the current one.
pub fn same_password() -> Error {
    Error::invalid_field(
        "password",
        "New password must differ from the current password",
    )
    .with_sub_code("same_password")
}

struct ResetGuard {
    claimed_stamp: i64,
    new_password: Zeroizing<String>,
    hasher: Arc<dyn CredentialHasher>,
}

#[async_trait]
impl Precondition<User> for ResetGuard {
    async fn check(&self, current: &User) -> Result<(), Error> {
        if current.reset_stamp() == 0 {
            return Err(reset_link_already_used());
        }
        if current.reset_stamp() != self.claimed_stamp {
            return Err(reset_link_invalid());
        }
        let unchanged = verify_blocking(
            Arc::clone(&self.hasher),
            self.new_password.clone(),
            current.password_hash().to_owned(),
        )
        .await?;
        if unchanged {
            return Err(same_password());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "auth_service_tests.rs"]
mod tests;
