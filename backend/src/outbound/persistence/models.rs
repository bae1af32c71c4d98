//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Writes are built from a fully merged domain
//! entity, so every changeset rewrites the whole row.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{CatalogueEntry, CatalogueKind, User};

use super::schema::{catalogue_entries, users};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub photo: Option<String>,
    pub remember_me_token: Option<String>,
    pub reset_stamp: i64,
    pub is_admin: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self::from_storage(
            row.id,
            row.first_name,
            row.last_name,
            row.email,
            row.password,
            row.photo,
            row.remember_me_token,
            row.reset_stamp,
            row.is_admin,
            row.is_verified,
            row.created_at,
            row.updated_at,
        )
    }
}

/// Insertable struct for creating new user records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub photo: Option<&'a str>,
    pub remember_me_token: Option<&'a str>,
    pub reset_stamp: i64,
    pub is_admin: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a User> for NewUserRow<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: user.id(),
            first_name: user.first_name(),
            last_name: user.last_name(),
            email: user.email().as_ref(),
            password: user.password_hash(),
            photo: user.photo(),
            remember_me_token: user.remember_me_token(),
            reset_stamp: user.reset_stamp(),
            is_admin: user.is_admin(),
            is_verified: user.is_verified(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        }
    }
}

/// Changeset struct for updating existing user records.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserChangeset<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub photo: Option<&'a str>,
    pub remember_me_token: Option<&'a str>,
    pub reset_stamp: i64,
    pub is_admin: bool,
    pub is_verified: bool,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a User> for UserChangeset<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            first_name: user.first_name(),
            last_name: user.last_name(),
            email: user.email().as_ref(),
            password: user.password_hash(),
            photo: user.photo(),
            remember_me_token: user.remember_me_token(),
            reset_stamp: user.reset_stamp(),
            is_admin: user.is_admin(),
            is_verified: user.is_verified(),
            updated_at: user.updated_at(),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalogue models
// ---------------------------------------------------------------------------

/// Row struct for reading from the catalogue_entries table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = catalogue_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CatalogueRow {
    pub id: Uuid,
    pub research_category_id: Option<Uuid>,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogueRow {
    /// Rebuild the entry; the caller has already filtered by kind.
    pub(crate) fn into_entry<K: CatalogueKind>(self) -> CatalogueEntry<K> {
        CatalogueEntry::from_storage(
            self.id,
            self.research_category_id,
            self.label,
            self.created_at,
            self.updated_at,
        )
    }
}

/// Insertable struct for creating catalogue entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = catalogue_entries)]
pub(crate) struct NewCatalogueRow<'a> {
    pub id: Uuid,
    pub kind: &'static str,
    pub research_category_id: Option<Uuid>,
    pub label: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a, K: CatalogueKind> From<&'a CatalogueEntry<K>> for NewCatalogueRow<'a> {
    fn from(entry: &'a CatalogueEntry<K>) -> Self {
        Self {
            id: entry.id(),
            kind: K::KIND,
            research_category_id: entry.research_category_id(),
            label: entry.label(),
            created_at: entry.created_at(),
            updated_at: entry.updated_at(),
        }
    }
}

/// Changeset struct for updating catalogue entries.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = catalogue_entries)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct CatalogueChangeset<'a> {
    pub research_category_id: Option<Uuid>,
    pub label: &'a str,
    pub updated_at: DateTime<Utc>,
}

impl<'a, K: CatalogueKind> From<&'a CatalogueEntry<K>> for CatalogueChangeset<'a> {
    fn from(entry: &'a CatalogueEntry<K>) -> Self {
        Self {
            research_category_id: entry.research_category_id(),
            label: entry.label(),
            updated_at: entry.updated_at(),
        }
    }
}
