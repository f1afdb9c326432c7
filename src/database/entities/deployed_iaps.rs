use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Immutable snapshot of a plan taken at deploy time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deployed_iaps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub iap_id: i32,
    pub name: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub properties: serde_json::Value,
    #[sea_orm(column_type = "JsonBinary")]
    pub nodes: serde_json::Value,
    #[sea_orm(column_type = "JsonBinary")]
    pub edges: serde_json::Value,
    #[sea_orm(column_type = "JsonBinary")]
    pub objectives: serde_json::Value,
    pub deploy_url: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::iaps::Entity",
        from = "Column::IapId",
        to = "super::iaps::Column::Id"
    )]
    Iaps,
    #[sea_orm(has_many = "super::deployed_iap_activities::Entity")]
    DeployedIapActivities,
    #[sea_orm(has_many = "super::objectives::Entity")]
    Objectives,
    #[sea_orm(has_many = "super::scores::Entity")]
    Scores,
}

impl Related<super::iaps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Iaps.def()
    }
}

impl Related<super::deployed_iap_activities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeployedIapActivities.def()
    }
}

impl Related<super::objectives::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Objectives.def()
    }
}

impl Related<super::scores::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Scores.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
