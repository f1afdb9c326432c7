use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::database::entities::users;
use crate::database::migrations::Migrator;

pub async fn setup_test_db() -> DatabaseConnection {
    // Every connection to sqlite::memory: is its own database, so pin the pool to one
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("Failed to connect to test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Insert a user directly, skipping password hashing.
pub async fn insert_user(db: &DatabaseConnection, name: &str, email: &str) -> users::Model {
    users::ActiveModel::new(name.to_string(), email.to_string(), "not-a-hash".to_string())
        .insert(db)
        .await
        .expect("Failed to insert test user")
}
