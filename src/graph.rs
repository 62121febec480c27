//! Property-graph projection of entities
//!
//! Converts entities and their resolved schemas into an abstract
//! node/edge structure for export to graph backends. Entity references
//! become edges, matchable scalar values are reified into nodes of
//! their own so that two entities sharing an IBAN meet in the graph,
//! and schemas carrying an edge declaration are projected as edges
//! rather than nodes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::entity::Entity;
use crate::model::{Model, ModelError, Schema};
use crate::types::ENTITY_TYPE;

/// A node: an entity, or a reified scalar value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,

    #[serde(rename = "type")]
    pub type_name: String,

    pub value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

fn node_id(type_name: &str, value: &str) -> String {
    format!("{}:{}", type_name, value)
}

impl Node {
    fn for_entity(schema: &Schema, entity: &Entity) -> Node {
        Node {
            id: node_id(ENTITY_TYPE, &entity.id),
            type_name: ENTITY_TYPE.to_string(),
            value: entity.id.clone(),
            schema: Some(schema.name.clone()),
            caption: schema.caption(entity).map(str::to_string),
        }
    }

    /// Placeholder for a referenced entity that has not been added yet.
    fn stub(value: &str, range: Option<&str>) -> Node {
        Node {
            id: node_id(ENTITY_TYPE, value),
            type_name: ENTITY_TYPE.to_string(),
            value: value.to_string(),
            schema: range.map(str::to_string),
            caption: None,
        }
    }

    fn for_value(type_name: &str, value: &str) -> Node {
        Node {
            id: node_id(type_name, value),
            type_name: type_name.to_string(),
            value: value.to_string(),
            schema: None,
            caption: Some(value.to_string()),
        }
    }

    pub fn is_entity(&self) -> bool {
        self.type_name == ENTITY_TYPE
    }
}

/// An edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,

    /// Property or edge-schema name this edge came from
    #[serde(rename = "type")]
    pub type_name: String,

    /// The entity reified as this edge, for edge-declared schemas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

/// Accumulates nodes and edges from added entities
#[derive(Debug, Default, Serialize)]
pub struct Graph {
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<String, Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project one entity into the graph.
    pub fn add(&mut self, model: &Model, entity: &Entity) -> Result<(), ModelError> {
        let schema = model.get(&entity.schema)?;
        if schema.edge.is_some() {
            self.add_as_edge(schema, entity);
        } else {
            self.add_as_node(model, schema, entity);
        }
        Ok(())
    }

    fn add_as_node(&mut self, model: &Model, schema: &Schema, entity: &Entity) {
        let node = Node::for_entity(schema, entity);
        let source_id = node.id.clone();
        // a full node replaces any stub left by an earlier reference
        self.nodes.insert(node.id.clone(), node);

        for (name, values) in &entity.properties {
            let Some(property) = schema.property(name) else {
                continue;
            };
            let Some(property_type) = model.types().get(&property.type_name) else {
                continue;
            };
            if !property_type.is_matchable() {
                continue;
            }
            for value in values {
                if value.trim().is_empty() {
                    continue;
                }
                let target = if property_type.is_entity() {
                    Node::stub(value, property.range.as_deref())
                } else {
                    Node::for_value(property_type.name(), value)
                };
                let edge = Edge {
                    id: format!("{}<>{}", source_id, target.id),
                    source_id: source_id.clone(),
                    target_id: target.id.clone(),
                    type_name: property.name.clone(),
                    entity_id: None,
                };
                self.nodes.entry(target.id.clone()).or_insert(target);
                self.edges.insert(edge.id.clone(), edge);
            }
        }
    }

    fn add_as_edge(&mut self, schema: &Schema, entity: &Entity) {
        let Some(edge_spec) = &schema.edge else {
            return;
        };
        let source_range = schema.edge_source().and_then(|p| p.range.clone());
        let target_range = schema.edge_target().and_then(|p| p.range.clone());
        for source in entity.values(&edge_spec.source) {
            for target in entity.values(&edge_spec.target) {
                if source.trim().is_empty() || target.trim().is_empty() {
                    continue;
                }
                let source_node = Node::stub(source, source_range.as_deref());
                let target_node = Node::stub(target, target_range.as_deref());
                let edge = Edge {
                    id: format!("{}<{}>{}", source_node.id, entity.id, target_node.id),
                    source_id: source_node.id.clone(),
                    target_id: target_node.id.clone(),
                    type_name: schema.name.clone(),
                    entity_id: Some(entity.id.clone()),
                };
                self.nodes
                    .entry(source_node.id.clone())
                    .or_insert(source_node);
                self.nodes
                    .entry(target_node.id.clone())
                    .or_insert(target_node);
                self.edges.insert(edge.id.clone(), edge);
            }
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Edges leaving the given node.
    pub fn outbound(&self, node_id: &str) -> Vec<&Edge> {
        self.edges
            .values()
            .filter(|edge| edge.source_id == node_id)
            .collect()
    }

    /// Edges pointing at the given node.
    pub fn inbound(&self, node_id: &str) -> Vec<&Edge> {
        self.edges
            .values()
            .filter(|edge| edge.target_id == node_id)
            .collect()
    }
}
