use std::collections::HashSet;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "iaps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub properties: serde_json::Value,
    #[sea_orm(column_type = "JsonBinary")]
    pub nodes: serde_json::Value,
    #[sea_orm(column_type = "JsonBinary")]
    pub edges: serde_json::Value,
    pub is_deployed: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::iap_ownership::Entity")]
    IapOwnership,
    #[sea_orm(has_many = "super::activity_connections::Entity")]
    ActivityConnections,
    #[sea_orm(has_many = "super::deployed_iaps::Entity")]
    DeployedIaps,
}

impl Related<super::iap_ownership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IapOwnership.def()
    }
}

impl Related<super::activity_connections::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivityConnections.def()
    }
}

impl Related<super::deployed_iaps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeployedIaps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A node of the plan graph. The id is the id of the activity it stands for;
/// any other keys the editor stores (position, label, ...) are kept verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IapNode {
    #[serde(deserialize_with = "deserialize_graph_id")]
    pub id: i32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A directed edge between two nodes of the same plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IapEdge {
    #[serde(deserialize_with = "deserialize_graph_id")]
    pub source: i32,
    #[serde(deserialize_with = "deserialize_graph_id")]
    pub target: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Graph editors emit ids either as numbers or as numeric strings.
pub(crate) fn deserialize_graph_id<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    let raw = RawId::deserialize(deserializer)?;
    let value = match raw {
        RawId::Number(n) => n,
        RawId::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid node id '{}'", s)))?,
    };
    i32::try_from(value).map_err(|_| serde::de::Error::custom(format!("node id {} out of range", value)))
}

pub fn parse_nodes(value: &serde_json::Value) -> Result<Vec<IapNode>, serde_json::Error> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value.clone())
}

pub fn parse_edges(value: &serde_json::Value) -> Result<Vec<IapEdge>, serde_json::Error> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value.clone())
}

/// Returns every edge whose source or target is not among `nodes`.
pub fn dangling_edges(nodes: &[IapNode], edges: &[IapEdge]) -> Vec<(i32, i32)> {
    let node_ids: HashSet<i32> = nodes.iter().map(|n| n.id).collect();
    edges
        .iter()
        .filter(|e| !node_ids.contains(&e.source) || !node_ids.contains(&e.target))
        .map(|e| (e.source, e.target))
        .collect()
}

impl Model {
    pub fn parsed_nodes(&self) -> Result<Vec<IapNode>, serde_json::Error> {
        parse_nodes(&self.nodes)
    }

    pub fn parsed_edges(&self) -> Result<Vec<IapEdge>, serde_json::Error> {
        parse_edges(&self.edges)
    }

    /// Activity ids referenced by the plan's nodes, in node order.
    pub fn activity_ids(&self) -> Result<Vec<i32>, serde_json::Error> {
        Ok(self.parsed_nodes()?.into_iter().map(|n| n.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nodes_accept_numeric_and_string_ids() {
        let nodes = parse_nodes(&json!([
            {"id": 1, "position": {"x": 0, "y": 0}},
            {"id": "2", "data": {"label": "Quiz"}}
        ]))
        .unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, 1);
        assert_eq!(nodes[1].id, 2);
        assert!(nodes[1].extra.contains_key("data"));
    }

    #[test]
    fn test_non_numeric_id_is_rejected() {
        assert!(parse_nodes(&json!([{"id": "intro"}])).is_err());
    }

    #[test]
    fn test_null_graph_is_empty() {
        assert!(parse_nodes(&serde_json::Value::Null).unwrap().is_empty());
        assert!(parse_edges(&serde_json::Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_dangling_edges_detected() {
        let nodes = parse_nodes(&json!([{"id": 1}, {"id": 2}])).unwrap();
        let edges = parse_edges(&json!([
            {"source": 1, "target": 2},
            {"source": 2, "target": 3},
            {"source": "9", "target": "1", "label": "done"}
        ]))
        .unwrap();

        assert_eq!(dangling_edges(&nodes, &edges), vec![(2, 3), (9, 1)]);
    }

    #[test]
    fn test_edge_label_round_trips_extra_keys() {
        let edges = parse_edges(&json!([{"id": "e1-2", "source": 1, "target": 2}])).unwrap();
        assert_eq!(edges[0].label, None);
        let back = serde_json::to_value(&edges).unwrap();
        assert_eq!(back, json!([{"id": "e1-2", "source": 1, "target": 2}]));
    }
}
