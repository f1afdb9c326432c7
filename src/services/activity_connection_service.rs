use std::collections::HashSet;

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::database::entities::activity_connections::{self, DEFAULT_LABEL};
use crate::database::entities::iaps::IapEdge;
use crate::errors::CoreResult;

/// Read access to the per-edge connection rows of plans
#[derive(Clone)]
pub struct ActivityConnectionService {
    db: DatabaseConnection,
}

impl ActivityConnectionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> CoreResult<Vec<activity_connections::Model>> {
        Ok(activity_connections::Entity::find()
            .order_by_asc(activity_connections::Column::IapId)
            .order_by_asc(activity_connections::Column::Source)
            .order_by_asc(activity_connections::Column::Target)
            .all(&self.db)
            .await?)
    }

    pub async fn by_iap(&self, iap_id: i32) -> CoreResult<Vec<activity_connections::Model>> {
        Ok(activity_connections::Entity::find()
            .filter(activity_connections::Column::IapId.eq(iap_id))
            .order_by_asc(activity_connections::Column::Source)
            .order_by_asc(activity_connections::Column::Target)
            .all(&self.db)
            .await?)
    }

    /// Connections where the activity is either end of the edge
    pub async fn by_activity(
        &self,
        activity_id: i32,
    ) -> CoreResult<Vec<activity_connections::Model>> {
        Ok(activity_connections::Entity::find()
            .filter(
                Condition::any()
                    .add(activity_connections::Column::Source.eq(activity_id))
                    .add(activity_connections::Column::Target.eq(activity_id)),
            )
            .order_by_asc(activity_connections::Column::IapId)
            .all(&self.db)
            .await?)
    }
}

/// Rewrite the connection rows of a plan from its edge list.
///
/// Repeated (source, target) pairs keep the first edge's label.
pub async fn replace_for_iap<C: ConnectionTrait>(
    conn: &C,
    iap_id: i32,
    edges: &[IapEdge],
) -> Result<(), DbErr> {
    delete_by_iap(conn, iap_id).await?;

    let mut seen = HashSet::new();
    let rows: Vec<activity_connections::ActiveModel> = edges
        .iter()
        .filter(|edge| seen.insert((edge.source, edge.target)))
        .map(|edge| activity_connections::ActiveModel {
            source: Set(edge.source),
            target: Set(edge.target),
            iap_id: Set(iap_id),
            label: Set(edge
                .label
                .clone()
                .unwrap_or_else(|| DEFAULT_LABEL.to_string())),
        })
        .collect();

    if rows.is_empty() {
        return Ok(());
    }

    activity_connections::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

pub async fn delete_by_iap<C: ConnectionTrait>(conn: &C, iap_id: i32) -> Result<u64, DbErr> {
    let result = activity_connections::Entity::delete_many()
        .filter(activity_connections::Column::IapId.eq(iap_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
