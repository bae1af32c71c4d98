//! Command-line front end.
//!
//! Each subcommand maps onto one service operation and reports its outcome
//! as a [`ResponseEnvelope`]. Process wiring (settings, storage, logging)
//! belongs to the binary.

use clap::{Args, Parser, Subcommand};
use pagination::PageParams;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::app::Backend;
use crate::domain::catalogue::ResearchCategory;
use crate::domain::{
    AuthService, CatalogueEntry, CatalogueField, Credentials, Entity, Error, FieldMap, FieldValue,
    SignInStatus, SignUpRequest, field_map_from_json,
};

use super::envelope::ResponseEnvelope;

/// `research-backend` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "research-backend",
    about = "Account lifecycle and catalogue maintenance for the research backend",
    version
)]
pub struct Cli {
    /// Database connection URL. Falls back to `DATABASE_URL`; without either
    /// the command runs against process-local storage.
    #[arg(long = "database-url", value_name = "url", global = true)]
    pub database_url: Option<String>,
    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// One service operation.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Register an account and send its verification email.
    Signup(SignupArgs),
    /// Exchange credentials for a session token.
    Signin(CredentialArgs),
    /// Confirm an email address with a verification token.
    Verify {
        /// Token from the verification link.
        token: String,
    },
    /// Email a single-use password reset link.
    RequestReset {
        /// Account email.
        #[arg(long)]
        email: String,
    },
    /// Set a new password with a reset token.
    ResetPassword {
        /// Token from the reset link.
        #[arg(long)]
        token: String,
        /// New password.
        #[arg(long)]
        password: String,
    },
    /// Show the account behind a session token.
    Whoami {
        /// Session token.
        #[arg(long)]
        token: String,
        /// Fail unless the account is an administrator.
        #[arg(long)]
        require_admin: bool,
    },
    /// Prefix search over user names.
    SearchUsers {
        /// Name prefix; empty matches everyone.
        #[arg(long, default_value = "")]
        term: String,
        /// Paging and ordering.
        #[command(flatten)]
        page: PageArgs,
    },
    /// Research category maintenance.
    Categories {
        /// Category operation.
        #[command(subcommand)]
        action: CategoryCommand,
    },
}

/// Research category operations.
#[derive(Debug, Clone, Subcommand)]
pub enum CategoryCommand {
    /// One page of categories.
    List(PageArgs),
    /// Create a category.
    Create {
        /// Category title.
        #[arg(long)]
        title: String,
    },
    /// Apply a JSON patch such as `{"title": "Physics"}` to a category.
    Update {
        /// Category id.
        #[arg(long)]
        id: Uuid,
        /// JSON object of camelCase field names to new values.
        #[arg(long)]
        patch: String,
    },
    /// Delete a category no other catalogue entry refers to.
    Delete {
        /// Category id.
        #[arg(long)]
        id: Uuid,
    },
    /// One page of the disciplines filed under a category.
    Disciplines {
        /// Category id.
        #[arg(long)]
        id: Uuid,
        /// Paging and ordering.
        #[command(flatten)]
        page: PageArgs,
    },
}

/// Sign-up fields.
#[derive(Debug, Clone, Args)]
pub struct SignupArgs {
    /// Given name.
    #[arg(long)]
    pub first_name: String,
    /// Family name.
    #[arg(long)]
    pub last_name: String,
    /// Login email.
    #[arg(long)]
    pub email: String,
    /// Password.
    #[arg(long)]
    pub password: String,
    /// Optional photo URL.
    #[arg(long)]
    pub photo: Option<String>,
}

/// Login credentials.
#[derive(Debug, Clone, Args)]
pub struct CredentialArgs {
    /// Login email.
    #[arg(long)]
    pub email: String,
    /// Password.
    #[arg(long)]
    pub password: String,
}

/// Raw `limit`, `page` and `sort` parameters, validated by the service.
#[derive(Debug, Clone, Default, Args)]
pub struct PageArgs {
    /// Page size.
    #[arg(long)]
    pub limit: Option<String>,
    /// One-based page number.
    #[arg(long)]
    pub page: Option<String>,
    /// `field` or `field:asc|desc`.
    #[arg(long)]
    pub sort: Option<String>,
}

impl PageArgs {
    fn params(&self) -> PageParams {
        PageParams::new(
            self.limit.as_deref(),
            self.page.as_deref(),
            self.sort.as_deref(),
        )
    }
}

fn parse_patch(raw: &str) -> Result<FieldMap<CatalogueField>, Error> {
    let payload: Map<String, Value> = serde_json::from_str(raw)
        .map_err(|err| Error::invalid_field("patch", format!("patch must be a JSON object: {err}")))?;
    field_map_from_json::<CatalogueEntry<ResearchCategory>>(&payload)
}

fn to_value(value: &impl serde::Serialize) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|err| Error::internal(format!("serialise response: {err}")))
}

/// Run `command` against `backend`.
pub async fn execute(command: Command, backend: &Backend) -> Result<ResponseEnvelope, Error> {
    let auth = &backend.auth;
    match command {
        Command::Signup(args) => {
            let request = SignUpRequest::try_from_parts(
                &args.first_name,
                &args.last_name,
                &args.email,
                &args.password,
                args.photo.as_deref(),
            )?;
            let outcome = auth.sign_up(request).await?;
            Ok(ResponseEnvelope {
                message: Some("Account created; check your email to verify it".to_owned()),
                ..ResponseEnvelope::created(to_value(&outcome)?)
            })
        }
        Command::Signin(args) => {
            let credentials = Credentials::try_from_parts(&args.email, &args.password)?;
            let outcome = auth.authentication(&credentials).await?;
            Ok(match outcome.status {
                SignInStatus::Authenticated => {
                    ResponseEnvelope::with_message(outcome.message, json!({ "token": outcome.token }))
                }
                SignInStatus::Unverified => ResponseEnvelope::rejected(403, outcome.message),
                SignInStatus::Invalid => ResponseEnvelope::rejected(401, outcome.message),
            })
        }
        Command::Verify { token } => {
            let user = auth.account_verification(&token).await?;
            Ok(ResponseEnvelope::with_message(
                "Account verified",
                Value::Object(user.to_public()),
            ))
        }
        Command::RequestReset { email } => {
            let outcome = auth.send_password_reset_link(&email).await?;
            Ok(ResponseEnvelope::with_message(
                "Password reset link sent",
                to_value(&outcome)?,
            ))
        }
        Command::ResetPassword { token, password } => {
            auth.update_password(&token, &password).await?;
            Ok(ResponseEnvelope::message("Password updated"))
        }
        Command::Whoami {
            token,
            require_admin,
        } => {
            let user = auth.check_authentication(&token).await?;
            if require_admin {
                AuthService::require_admin(&user)?;
            }
            Ok(ResponseEnvelope::user(&user))
        }
        Command::SearchUsers { term, page } => {
            let hits = auth.search(&term, &page.params()).await?;
            Ok(ResponseEnvelope::ok(to_value(&hits)?))
        }
        Command::Categories { action } => {
            let categories = &backend.catalogues.research_categories;
            match action {
                CategoryCommand::List(page) => {
                    Ok(ResponseEnvelope::page(&categories.list(&page.params()).await?))
                }
                CategoryCommand::Create { title } => {
                    let fields =
                        FieldMap::from([(CatalogueField::Title, FieldValue::from(title))]);
                    let entry = categories.create(fields).await?;
                    Ok(ResponseEnvelope::created(Value::Object(entry.to_public())))
                }
                CategoryCommand::Update { id, patch } => {
                    let entry = categories.update(id, parse_patch(&patch)?).await?;
                    Ok(ResponseEnvelope::ok(Value::Object(entry.to_public())))
                }
                CategoryCommand::Delete { id } => {
                    categories.delete(id).await?;
                    Ok(ResponseEnvelope::message("Research category deleted"))
                }
                CategoryCommand::Disciplines { id, page } => {
                    let disciplines = &backend.catalogues.disciplines;
                    categories.get(id).await?;
                    Ok(ResponseEnvelope::page(
                        &disciplines.list_in_category(id, &page.params()).await?,
                    ))
                }
            }
        }
    }
}
