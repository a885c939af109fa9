//! Database connection utilities.

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

/// Pragmas applied to every SQLite connection.
///
/// - `foreign_keys=ON` - account deletion cascades to references and tracked repositories
/// - `journal_mode=WAL` - readers don't block the writer during bulk syncs
/// - `busy_timeout=5000` - wait up to 5 seconds for locks instead of failing immediately
/// - `synchronous=NORMAL` - safe with WAL and faster than FULL
const SQLITE_PRAGMAS: [&str; 4] = [
    "PRAGMA foreign_keys=ON",
    "PRAGMA journal_mode=WAL",
    "PRAGMA busy_timeout=5000",
    "PRAGMA synchronous=NORMAL",
];

async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in SQLITE_PRAGMAS {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }
    Ok(())
}

/// Establish a connection to the database.
///
/// SQLite file databases get the pragmas listed in [`SQLITE_PRAGMAS`].
///
/// # Arguments
/// * `database_url` - Database connection string (e.g., `sqlite:///path/to/db` or `postgres:///steward`)
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    if database_url.starts_with("sqlite://") {
        configure_sqlite(&db).await?;
    }

    Ok(db)
}

/// Establish a connection to the database and run all pending migrations.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established or migrations fail.
///
/// # Example
/// ```ignore
/// let db = steward::connect_and_migrate("sqlite::memory:").await?;
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}
