//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered accounts.
    users (id) {
        id -> Uuid,
        first_name -> Varchar,
        last_name -> Varchar,
        /// Unique login identifier.
        email -> Varchar,
        /// Argon2id PHC string; never plaintext.
        password -> Varchar,
        photo -> Nullable<Varchar>,
        remember_me_token -> Nullable<Varchar>,
        /// Millisecond stamp of the outstanding reset link; 0 when none.
        reset_stamp -> Int8,
        is_admin -> Bool,
        is_verified -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Every catalogue resource, discriminated by `kind`.
    ///
    /// `research_category_id` references another row of kind
    /// `research_category`; deletes of a referenced row are restricted.
    catalogue_entries (id) {
        id -> Uuid,
        kind -> Varchar,
        research_category_id -> Nullable<Uuid>,
        label -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
