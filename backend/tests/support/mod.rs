//! Embedded PostgreSQL helpers shared by the Diesel adapter suites.
//!
//! Every context gets its own temporary database on the shared cluster, with
//! the crate's migrations applied, plus a pool and a runtime to drive the
//! async repositories from synchronous tests.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use pg_embedded_setup_unpriv::test_support::shared_cluster_handle;
use research_backend::outbound::persistence::{DbPool, PoolConfig};
use tokio::runtime::Runtime;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runtime, pool and the database they point at.
pub struct PgContext {
    pub runtime: Runtime,
    pub pool: DbPool,
    _database: TemporaryDatabase,
}

/// Returns true when `SKIP_TEST_CLUSTER` is `1`, `true` or `yes`.
fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip with a marker when `SKIP_TEST_CLUSTER` is set, otherwise fail loudly.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}

fn migrate_schema(url: &str) -> Result<(), String> {
    let mut conn = PgConnection::establish(url).map_err(|err| format!("connect: {err}"))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| format!("migration: {err}"))?;
    Ok(())
}

/// Fresh migrated database with a four-connection pool.
pub fn pg_context() -> Result<PgContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster_handle().map_err(|err| format!("{err:?}"))?;
    let database_name = format!("test_{}", uuid::Uuid::new_v4().simple());
    let database = cluster
        .temporary_database(database_name.as_str())
        .map_err(|err| format!("{err:?}"))?;
    let url = database.url().to_string();
    migrate_schema(&url)?;

    let config = PoolConfig::new(url).with_max_size(4).with_min_idle(Some(1));
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| err.to_string())?;
    Ok(PgContext {
        runtime,
        pool,
        _database: database,
    })
}
