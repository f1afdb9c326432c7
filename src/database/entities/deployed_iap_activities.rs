use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activity membership of a deployment, captured at deploy time. The activity
/// name is copied so the snapshot survives later edits or deletion.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deployed_iap_activities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub deployed_iap_id: i32,
    pub activity_id: i32,
    pub name: String,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::deployed_iaps::Entity",
        from = "Column::DeployedIapId",
        to = "super::deployed_iaps::Column::Id"
    )]
    DeployedIaps,
}

impl Related<super::deployed_iaps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeployedIaps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
