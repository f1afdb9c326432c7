use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "objective_analytics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub objective_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub analytics_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::objectives::Entity",
        from = "Column::ObjectiveId",
        to = "super::objectives::Column::Id"
    )]
    Objectives,
    #[sea_orm(
        belongs_to = "super::analytics::Entity",
        from = "Column::AnalyticsId",
        to = "super::analytics::Column::Id"
    )]
    Analytics,
}

impl Related<super::objectives::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Objectives.def()
    }
}

impl Related<super::analytics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analytics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
