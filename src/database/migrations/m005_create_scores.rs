use sea_orm_migration::prelude::*;

use super::m001_create_users::Users;
use super::m004_create_deployments::DeployedIaps;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Scores::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Scores::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Scores::UserId).integer().not_null())
                    .col(ColumnDef::new(Scores::DeployedIapId).integer().not_null())
                    .col(ColumnDef::new(Scores::ActivityId).integer().not_null())
                    .col(ColumnDef::new(Scores::Score).integer().not_null())
                    .col(ColumnDef::new(Scores::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scores_user_id")
                            .from(Scores::Table, Scores::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scores_deployed_iap_id")
                            .from(Scores::Table, Scores::DeployedIapId)
                            .to(DeployedIaps::Table, DeployedIaps::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scores_user_deployment_activity")
                    .table(Scores::Table)
                    .col(Scores::UserId)
                    .col(Scores::DeployedIapId)
                    .col(Scores::ActivityId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Scores::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Scores {
    Table,
    Id,
    UserId,
    DeployedIapId,
    ActivityId,
    Score,
    UpdatedAt,
}
