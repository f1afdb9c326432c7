use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LABEL: &str = "not-completed";

/// One row per edge of a plan, keyed by (source, target, iap).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_connections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub source: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub target: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub iap_id: i32,
    pub label: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::iaps::Entity",
        from = "Column::IapId",
        to = "super::iaps::Column::Id"
    )]
    Iaps,
}

impl Related<super::iaps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Iaps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
