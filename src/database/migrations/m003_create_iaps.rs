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
                    .table(Iaps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Iaps::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Iaps::Name).string().not_null())
                    .col(ColumnDef::new(Iaps::Properties).json_binary().not_null())
                    .col(ColumnDef::new(Iaps::Nodes).json_binary().not_null())
                    .col(ColumnDef::new(Iaps::Edges).json_binary().not_null())
                    .col(ColumnDef::new(Iaps::IsDeployed).boolean().not_null().default(false))
                    .col(ColumnDef::new(Iaps::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Iaps::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IapOwnership::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(IapOwnership::UsersId).integer().not_null())
                    .col(ColumnDef::new(IapOwnership::IapId).integer().not_null())
                    .col(ColumnDef::new(IapOwnership::IsOwner).boolean().not_null().default(false))
                    .primary_key(
                        Index::create()
                            .col(IapOwnership::UsersId)
                            .col(IapOwnership::IapId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_iap_ownership_users_id")
                            .from(IapOwnership::Table, IapOwnership::UsersId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_iap_ownership_iap_id")
                            .from(IapOwnership::Table, IapOwnership::IapId)
                            .to(Iaps::Table, Iaps::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Source and target are node ids, which need not resolve to a stored
        // activity, so only the plan side carries a foreign key.
        manager
            .create_table(
                Table::create()
                    .table(ActivityConnections::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ActivityConnections::Source).integer().not_null())
                    .col(ColumnDef::new(ActivityConnections::Target).integer().not_null())
                    .col(ColumnDef::new(ActivityConnections::IapId).integer().not_null())
                    .col(
                        ColumnDef::new(ActivityConnections::Label)
                            .string()
                            .not_null()
                            .default("not-completed"),
                    )
                    .primary_key(
                        Index::create()
                            .col(ActivityConnections::Source)
                            .col(ActivityConnections::Target)
                            .col(ActivityConnections::IapId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_connections_iap_id")
                            .from(ActivityConnections::Table, ActivityConnections::IapId)
                            .to(Iaps::Table, Iaps::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activity_connections_iap_id")
                    .table(ActivityConnections::Table)
                    .col(ActivityConnections::IapId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActivityConnections::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IapOwnership::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Iaps::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub enum Iaps {
    Table,
    Id,
    Name,
    Properties,
    Nodes,
    Edges,
    IsDeployed,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum IapOwnership {
    Table,
    UsersId,
    IapId,
    IsOwner,
}

#[derive(DeriveIden)]
enum ActivityConnections {
    Table,
    Source,
    Target,
    IapId,
    Label,
}
