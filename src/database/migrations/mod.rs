use sea_orm_migration::prelude::*;

mod m001_create_users;
mod m002_create_activities;
mod m003_create_iaps;
mod m004_create_deployments;
mod m005_create_scores;
mod m006_unique_analytics_name;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_create_users::Migration),
            Box::new(m002_create_activities::Migration),
            Box::new(m003_create_iaps::Migration),
            Box::new(m004_create_deployments::Migration),
            Box::new(m005_create_scores::Migration),
            Box::new(m006_unique_analytics_name::Migration),
        ]
    }
}
