use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;

use super::migrations::Migrator;

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url);

    // SQLite serialises writes, so a large pool buys nothing there
    let max_connections = if database_url.starts_with("sqlite") { 10 } else { 50 };

    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    Database::connect(opt).await
}

/// Normalise a database location into a connection URL.
///
/// Full URLs (`sqlite://...`, `postgres://...`) pass through untouched, a bare
/// path becomes a SQLite file that is created on first use.
pub fn get_database_url(database: Option<&str>) -> String {
    match database {
        Some(":memory:") => "sqlite::memory:".to_string(),
        Some(url) if url.contains("://") || url.starts_with("sqlite:") => url.to_string(),
        Some(path) => format!("sqlite://{}?mode=rwc", path),
        None => crate::config::DEFAULT_DATABASE_URL.to_string(),
    }
}

/// Apply every pending migration.
pub async fn setup_database(db: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(db, None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_normalisation() {
        assert_eq!(get_database_url(Some(":memory:")), "sqlite::memory:");
        assert_eq!(
            get_database_url(Some("data/app.db")),
            "sqlite://data/app.db?mode=rwc"
        );
        assert_eq!(
            get_database_url(Some("postgres://user:pw@localhost/invenira")),
            "postgres://user:pw@localhost/invenira"
        );
        assert_eq!(get_database_url(None), crate::config::DEFAULT_DATABASE_URL);
    }
}
