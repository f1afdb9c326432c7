use sea_orm_migration::prelude::*;

use super::m002_create_activities::Analytics;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One metric of a given name per activity, so progress writes can upsert
        manager
            .create_index(
                Index::create()
                    .name("idx_analytics_activity_name")
                    .table(Analytics::Table)
                    .col(Analytics::ActivityId)
                    .col(Analytics::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_analytics_activity_name")
                    .table(Analytics::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
