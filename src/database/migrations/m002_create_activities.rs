use sea_orm_migration::prelude::*;

use super::m001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Activities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Activities::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Activities::Name).string().not_null())
                    .col(ColumnDef::new(Activities::Properties).json_binary().not_null())
                    .col(ColumnDef::new(Activities::ConfigUrl).string())
                    .col(ColumnDef::new(Activities::JsonParams).string())
                    .col(ColumnDef::new(Activities::UserUrl).string())
                    .col(ColumnDef::new(Activities::AnalyticsUrl).string())
                    .col(ColumnDef::new(Activities::IsDeployed).boolean().not_null().default(false))
                    .col(ColumnDef::new(Activities::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Activities::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UsersActivities::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UsersActivities::UsersId).integer().not_null())
                    .col(ColumnDef::new(UsersActivities::ActivityId).integer().not_null())
                    .col(ColumnDef::new(UsersActivities::IsOwner).boolean().not_null().default(false))
                    .primary_key(
                        Index::create()
                            .col(UsersActivities::UsersId)
                            .col(UsersActivities::ActivityId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_activities_users_id")
                            .from(UsersActivities::Table, UsersActivities::UsersId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_activities_activity_id")
                            .from(UsersActivities::Table, UsersActivities::ActivityId)
                            .to(Activities::Table, Activities::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Analytics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Analytics::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Analytics::ActivityId).integer().not_null())
                    .col(ColumnDef::new(Analytics::Name).string().not_null())
                    .col(ColumnDef::new(Analytics::Score).integer().not_null().default(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_analytics_activity_id")
                            .from(Analytics::Table, Analytics::ActivityId)
                            .to(Activities::Table, Activities::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_analytics_activity_id")
                    .table(Analytics::Table)
                    .col(Analytics::ActivityId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Analytics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UsersActivities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Activities::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Activities {
    Table,
    Id,
    Name,
    Properties,
    ConfigUrl,
    JsonParams,
    UserUrl,
    AnalyticsUrl,
    IsDeployed,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UsersActivities {
    Table,
    UsersId,
    ActivityId,
    IsOwner,
}

#[derive(DeriveIden)]
pub enum Analytics {
    Table,
    Id,
    ActivityId,
    Name,
    Score,
}
