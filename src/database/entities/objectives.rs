use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "objectives")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub deployed_iap_id: i32,
    pub iap_id: i32,
    pub name: String,
    pub target: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::deployed_iaps::Entity",
        from = "Column::DeployedIapId",
        to = "super::deployed_iaps::Column::Id"
    )]
    DeployedIaps,
    #[sea_orm(has_many = "super::objective_analytics::Entity")]
    ObjectiveAnalytics,
}

impl Related<super::deployed_iaps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeployedIaps.def()
    }
}

impl Related<super::objective_analytics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ObjectiveAnalytics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
