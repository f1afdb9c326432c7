use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// Links a user to a plan. The author holds `is_owner = true`; learners who
/// add a deployment of the plan get a non-owner row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "iap_ownership")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub users_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub iap_id: i32,
    pub is_owner: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UsersId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::iaps::Entity",
        from = "Column::IapId",
        to = "super::iaps::Column::Id"
    )]
    Iaps,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::iaps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Iaps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn link(users_id: i32, iap_id: i32, is_owner: bool) -> Self {
        Self {
            users_id: Set(users_id),
            iap_id: Set(iap_id),
            is_owner: Set(is_owner),
        }
    }
}
