use sea_orm_migration::prelude::*;

use super::m002_create_activities::Analytics;
use super::m003_create_iaps::Iaps;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeployedIaps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeployedIaps::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeployedIaps::IapId).integer().not_null())
                    .col(ColumnDef::new(DeployedIaps::Name).string().not_null())
                    .col(ColumnDef::new(DeployedIaps::Properties).json_binary().not_null())
                    .col(ColumnDef::new(DeployedIaps::Nodes).json_binary().not_null())
                    .col(ColumnDef::new(DeployedIaps::Edges).json_binary().not_null())
                    .col(ColumnDef::new(DeployedIaps::Objectives).json_binary().not_null())
                    .col(ColumnDef::new(DeployedIaps::DeployUrl).string().not_null())
                    .col(ColumnDef::new(DeployedIaps::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deployed_iaps_iap_id")
                            .from(DeployedIaps::Table, DeployedIaps::IapId)
                            .to(Iaps::Table, Iaps::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DeployedIapActivities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeployedIapActivities::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeployedIapActivities::DeployedIapId).integer().not_null())
                    .col(ColumnDef::new(DeployedIapActivities::ActivityId).integer().not_null())
                    .col(ColumnDef::new(DeployedIapActivities::Name).string().not_null())
                    .col(ColumnDef::new(DeployedIapActivities::Position).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deployed_iap_activities_deployed_iap_id")
                            .from(DeployedIapActivities::Table, DeployedIapActivities::DeployedIapId)
                            .to(DeployedIaps::Table, DeployedIaps::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Objectives::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Objectives::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Objectives::DeployedIapId).integer().not_null())
                    .col(ColumnDef::new(Objectives::IapId).integer().not_null())
                    .col(ColumnDef::new(Objectives::Name).string().not_null())
                    .col(ColumnDef::new(Objectives::Target).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_objectives_deployed_iap_id")
                            .from(Objectives::Table, Objectives::DeployedIapId)
                            .to(DeployedIaps::Table, DeployedIaps::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ObjectiveAnalytics::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ObjectiveAnalytics::ObjectiveId).integer().not_null())
                    .col(ColumnDef::new(ObjectiveAnalytics::AnalyticsId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(ObjectiveAnalytics::ObjectiveId)
                            .col(ObjectiveAnalytics::AnalyticsId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_objective_analytics_objective_id")
                            .from(ObjectiveAnalytics::Table, ObjectiveAnalytics::ObjectiveId)
                            .to(Objectives::Table, Objectives::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_objective_analytics_analytics_id")
                            .from(ObjectiveAnalytics::Table, ObjectiveAnalytics::AnalyticsId)
                            .to(Analytics::Table, Analytics::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deployed_iaps_iap_id")
                    .table(DeployedIaps::Table)
                    .col(DeployedIaps::IapId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ObjectiveAnalytics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Objectives::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DeployedIapActivities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DeployedIaps::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum DeployedIaps {
    Table,
    Id,
    IapId,
    Name,
    Properties,
    Nodes,
    Edges,
    Objectives,
    DeployUrl,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DeployedIapActivities {
    Table,
    Id,
    DeployedIapId,
    ActivityId,
    Name,
    Position,
}

#[derive(DeriveIden)]
enum Objectives {
    Table,
    Id,
    DeployedIapId,
    IapId,
    Name,
    Target,
}

#[derive(DeriveIden)]
enum ObjectiveAnalytics {
    Table,
    ObjectiveId,
    AnalyticsId,
}
