use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Name of the analytics row that carries an activity's own progress.
pub const ACTIVITY_PROGRESS: &str = "Activity Progress";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analytics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub activity_id: i32,
    pub name: String,
    pub score: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::activities::Entity",
        from = "Column::ActivityId",
        to = "super::activities::Column::Id"
    )]
    Activities,
    #[sea_orm(has_many = "super::objective_analytics::Entity")]
    ObjectiveAnalytics,
}

impl Related<super::activities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activities.def()
    }
}

impl Related<super::objective_analytics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ObjectiveAnalytics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
