use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub properties: serde_json::Value,
    pub config_url: Option<String>,
    pub json_params: Option<String>,
    pub user_url: Option<String>,
    pub analytics_url: Option<String>,
    pub is_deployed: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users_activities::Entity")]
    UsersActivities,
    #[sea_orm(has_many = "super::analytics::Entity")]
    Analytics,
}

impl Related<super::users_activities::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsersActivities.def()
    }
}

impl Related<super::analytics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analytics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
