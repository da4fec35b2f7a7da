use std::sync::Arc;

use axum::extract::FromRef;
use diesel::{
    SqliteConnection,
    connection::SimpleConnection,
    r2d2::{ConnectionManager, CustomizeConnection, Pool, PoolError},
};
use diesel_migrations::MigrationHarness;

use crate::{MIGRATIONS, config::Config};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Shared state of the HTTP server.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
}

/// SQLite only checks `REFERENCES` clauses on connections which ask for it.
#[derive(Debug)]
struct EnforceForeignKeys;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for EnforceForeignKeys
{
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Builds the connection pool for `database_url`.
///
/// Every connection to `:memory:` opens a fresh database, so in that case
/// the pool holds exactly one connection and never recycles it.
pub fn make_pool(database_url: &str) -> Result<DbPool, PoolError> {
    let in_memory = database_url == ":memory:";

    let builder = Pool::builder()
        .max_size(if in_memory { 1 } else { 10 })
        .connection_customizer(Box::new(EnforceForeignKeys));
    let builder = if in_memory {
        builder.idle_timeout(None).max_lifetime(None)
    } else {
        builder
    };

    builder.build(ConnectionManager::<SqliteConnection>::new(database_url))
}

pub fn run_migrations(
    pool: &DbPool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    tracing::info!(applied = applied.len(), "Ran pending migrations");
    Ok(())
}

#[cfg(test)]
pub fn test_pool() -> DbPool {
    let pool = make_pool(":memory:").unwrap();
    run_migrations(&pool).unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use diesel::prelude::*;

    use crate::schema::teams;
    use crate::state::test_pool;

    #[test]
    fn test_foreign_keys_are_enforced() {
        let pool = test_pool();
        let mut conn = pool.get().unwrap();

        let result = diesel::insert_into(teams::table)
            .values((
                teams::id.eq("team"),
                teams::tournament_id.eq("no such tournament"),
                teams::name.eq("Knights"),
            ))
            .execute(&mut conn);

        assert!(matches!(
            result,
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                _
            ))
        ));
    }
}
