use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

/// Progress of one learner on one activity of one deployment.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scores")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub deployed_iap_id: i32,
    pub activity_id: i32,
    pub score: i32,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::deployed_iaps::Entity",
        from = "Column::DeployedIapId",
        to = "super::deployed_iaps::Column::Id"
    )]
    DeployedIaps,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::deployed_iaps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeployedIaps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn is_valid_score(score: i32) -> bool {
    (MIN_SCORE..=MAX_SCORE).contains(&score)
}
