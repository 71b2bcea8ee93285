//! Result hydration
//!
//! Each row goes through three passes:
//!
//! 1. every node reachable from the row is resolved against the metadata and,
//!    if a class matches, materialized once per store identity;
//! 2. every relationship is resolved; when both endpoints are domain objects
//!    it is wired into their relationship fields, once per relationship id;
//! 3. the row is projected into mapped values.
//!
//! A relationship is unresolved, and dropped from the mapped output, unless
//! both of its endpoints are domain objects materialized in this result.
//! With no registered classes every relationship is dropped: null as a column
//! value, omitted inside lists, maps and paths.
//! Identity state lives for the whole result and is released with the
//! hydrator.

use crate::coerce::{scalar_array, MappedValue};
use crate::graph::{DomainObject, EntityRef, MappedPath, NodeModel, ObjectGraph, RelationshipModel};
use crate::metadata::MetaData;
use crate::value::{NodeRef, RelationshipRef, ResultRow, Value};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EntityKey {
    Node(u64),
    Relationship(u64),
}

enum Endpoint {
    Domain(usize),
    Generic,
    Unseen,
}

/// Per-result identity map and object graph
#[derive(Debug)]
pub(crate) struct Hydrator {
    metadata: Arc<MetaData>,
    graph: Arc<RwLock<ObjectGraph>>,
    identity: HashMap<EntityKey, usize>,
    generic_nodes: HashSet<u64>,
    generic_relationships: HashSet<u64>,
    wired: HashSet<u64>,
}

impl Hydrator {
    pub(crate) fn new(metadata: Arc<MetaData>) -> Self {
        Self {
            graph: Arc::new(RwLock::new(ObjectGraph::new(Arc::clone(&metadata)))),
            metadata,
            identity: HashMap::new(),
            generic_nodes: HashSet::new(),
            generic_relationships: HashSet::new(),
            wired: HashSet::new(),
        }
    }

    /// Run the materialization and wiring passes over a row
    pub(crate) fn register_row(&mut self, row: &ResultRow) {
        for value in row.values() {
            value.for_each_node(&mut |node| self.materialize_node(node));
        }
        let mut relationships = Vec::new();
        for value in row.values() {
            value.for_each_relationship(&mut |rel| relationships.push(rel));
        }
        for rel in relationships {
            self.materialize_relationship(rel);
        }
    }

    /// Register a row and project every column
    pub(crate) fn hydrate_row(&mut self, row: &ResultRow) -> Vec<(String, MappedValue)> {
        self.register_row(row);
        row.iter()
            .map(|(alias, value)| {
                (
                    alias.to_string(),
                    self.project(value).unwrap_or(MappedValue::Null),
                )
            })
            .collect()
    }

    /// Project one value of a registered row. `None` means the value is an
    /// unresolved relationship.
    pub(crate) fn project(&self, value: &Value) -> Option<MappedValue> {
        Some(match value {
            Value::Null => MappedValue::Null,
            Value::Boolean(b) => MappedValue::Boolean(*b),
            Value::Integer(i) => MappedValue::Integer(*i),
            Value::Float(f) => MappedValue::Float(*f),
            Value::String(s) => MappedValue::String(s.clone()),
            Value::List(items) => match scalar_array(items) {
                Some(array) => MappedValue::Array(array),
                None => MappedValue::List(items.iter().filter_map(|v| self.project(v)).collect()),
            },
            Value::Map(map) => MappedValue::Map(
                map.iter()
                    .filter_map(|(k, v)| self.project(v).map(|mv| (k.clone(), mv)))
                    .collect(),
            ),
            Value::Node(node) => self.project_node(node),
            Value::Relationship(rel) => return self.project_relationship(rel),
            Value::Path(path) => MappedValue::Path(MappedPath {
                nodes: path.nodes.iter().map(|n| self.project_node(n)).collect(),
                relationships: path
                    .relationships
                    .iter()
                    .filter_map(|r| self.project_relationship(r))
                    .collect(),
            }),
        })
    }

    /// Domain objects of `class` sitting directly in a column, or directly in
    /// a list column, in column order
    pub(crate) fn root_entities(&self, row: &ResultRow, class: &str) -> Vec<EntityRef> {
        let mut indices = Vec::new();
        let mut collect = |value: &Value| {
            let key = match value {
                Value::Node(n) => EntityKey::Node(n.id),
                Value::Relationship(r) => EntityKey::Relationship(r.id),
                _ => return,
            };
            if let Some(&idx) = self.identity.get(&key) {
                indices.push(idx);
            }
        };
        for value in row.values() {
            match value {
                Value::List(items) => items.iter().for_each(&mut collect),
                other => collect(other),
            }
        }

        let graph = self.graph.read();
        indices.retain(|&idx| graph.is_instance_of(idx, class));
        drop(graph);
        indices.into_iter().map(|idx| self.entity(idx)).collect()
    }

    /// Number of domain objects materialized so far
    #[cfg(test)]
    pub(crate) fn object_count(&self) -> usize {
        self.identity.len()
    }

    fn entity(&self, index: usize) -> EntityRef {
        EntityRef::new(Arc::clone(&self.graph), index)
    }

    fn materialize_node(&mut self, node: &NodeRef) {
        let key = EntityKey::Node(node.id);
        if self.identity.contains_key(&key) || self.generic_nodes.contains(&node.id) {
            return;
        }
        match self.metadata.resolve_node(&node.labels) {
            Some(class) => {
                trace!("Materializing node {} as {}", node.id, class.name());
                let object = DomainObject::from_node(Arc::clone(class), node);
                let idx = self.graph.write().insert(object);
                self.identity.insert(key, idx);
            }
            None => {
                debug!(
                    "No class registered for labels {:?}; node {} stays generic",
                    node.labels, node.id
                );
                self.generic_nodes.insert(node.id);
            }
        }
    }

    fn endpoint(&self, id: u64) -> Endpoint {
        if let Some(&idx) = self.identity.get(&EntityKey::Node(id)) {
            Endpoint::Domain(idx)
        } else if self.generic_nodes.contains(&id) {
            Endpoint::Generic
        } else {
            Endpoint::Unseen
        }
    }

    fn materialize_relationship(&mut self, rel: &RelationshipRef) {
        let key = EntityKey::Relationship(rel.id);
        if self.identity.contains_key(&key) || self.generic_relationships.contains(&rel.id) {
            return;
        }

        let (start, end) = match (self.endpoint(rel.start_id), self.endpoint(rel.end_id)) {
            (Endpoint::Domain(start), Endpoint::Domain(end)) => (start, end),
            (Endpoint::Unseen, _) | (_, Endpoint::Unseen) => {
                debug!(
                    "Relationship {} ({}) has an endpoint outside the result; dropping it",
                    rel.id, rel.rel_type
                );
                return;
            }
            _ => {
                debug!(
                    "Relationship {} ({}) touches an unmapped node; dropping it",
                    rel.id, rel.rel_type
                );
                return;
            }
        };

        let entity = {
            let graph = self.graph.read();
            let start_class = graph.class_of(start).name();
            let end_class = graph.class_of(end).name();
            self.metadata
                .resolve_relationship(&rel.rel_type, start_class, end_class)
                .cloned()
        };

        let entity_idx = match entity {
            Some(class) => {
                trace!("Materializing relationship {} as {}", rel.id, class.name());
                let object = DomainObject::from_relationship(class, rel, start, end);
                let idx = self.graph.write().insert(object);
                self.identity.insert(key, idx);
                Some(idx)
            }
            None => {
                self.generic_relationships.insert(rel.id);
                None
            }
        };

        if self.wired.insert(rel.id) {
            let attached = self.graph.write().wire(&rel.rel_type, start, end, entity_idx);
            if attached == 0 {
                trace!(
                    "Relationship {} ({}) matches no declared field",
                    rel.id, rel.rel_type
                );
            }
        }
    }

    fn project_node(&self, node: &NodeRef) -> MappedValue {
        match self.identity.get(&EntityKey::Node(node.id)) {
            Some(&idx) => MappedValue::Entity(self.entity(idx)),
            None => MappedValue::Node(NodeModel::from_wire(node)),
        }
    }

    fn project_relationship(&self, rel: &RelationshipRef) -> Option<MappedValue> {
        if let Some(&idx) = self.identity.get(&EntityKey::Relationship(rel.id)) {
            return Some(MappedValue::Entity(self.entity(idx)));
        }
        self.generic_relationships
            .contains(&rel.id)
            .then(|| MappedValue::Relationship(RelationshipModel::from_wire(rel)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_row;
    use crate::metadata::{ClassInfo, Direction};
    use serde_json::{json, Value as JsonValue};

    fn metadata() -> Arc<MetaData> {
        Arc::new(
            MetaData::builder()
                .register(
                    ClassInfo::node("t::User")
                        .relationship_field("friends", "FRIENDS", Direction::Outgoing, "t::User")
                        .relationship_field("ratings", "RATED", Direction::Outgoing, "t::Rating"),
                )
                .register(ClassInfo::node("t::Movie").relationship_field(
                    "ratings",
                    "RATED",
                    Direction::Incoming,
                    "t::Rating",
                ))
                .register(ClassInfo::relationship("t::Rating", "RATED"))
                .build()
                .unwrap(),
        )
    }

    fn row(columns: &[&str], values: Vec<JsonValue>) -> ResultRow {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        ResultRow::new(columns, decode_row(&values).unwrap()).unwrap()
    }

    fn user(id: u64, name: &str) -> JsonValue {
        json!({"_nexus_id": id, "_nexus_labels": ["User"], "name": name})
    }

    fn movie(id: u64, title: &str) -> JsonValue {
        json!({"_nexus_id": id, "_nexus_labels": ["Movie"], "title": title})
    }

    fn rel(id: u64, rel_type: &str, start: u64, end: u64) -> JsonValue {
        json!({"_nexus_id": id, "_nexus_type": rel_type, "_nexus_start": start, "_nexus_end": end})
    }

    #[test]
    fn test_same_identity_yields_same_instance_across_rows() {
        let mut h = Hydrator::new(metadata());
        let first = h.hydrate_row(&row(&["u"], vec![user(1, "Vince")]));
        let second = h.hydrate_row(&row(&["u"], vec![user(1, "ignored")]));
        assert_eq!(first[0].1, second[0].1);
        assert_eq!(h.object_count(), 1);
        let entity = first[0].1.as_entity().unwrap();
        assert_eq!(entity.property("name"), MappedValue::from("Vince"));
    }

    #[test]
    fn test_relationship_entity_shared_by_both_endpoints() {
        let mut h = Hydrator::new(metadata());
        let mapped = h.hydrate_row(&row(
            &["u", "r", "m"],
            vec![user(1, "Vince"), rel(10, "RATED", 1, 2), movie(2, "Top Gear")],
        ));
        let u = mapped[0].1.as_entity().unwrap();
        let r = mapped[1].1.as_entity().unwrap();
        let m = mapped[2].1.as_entity().unwrap();
        assert_eq!(u.related("ratings").unwrap(), vec![r.clone()]);
        assert_eq!(m.related("ratings").unwrap(), vec![r.clone()]);
        assert_eq!(r.start().as_ref(), Some(u));
        assert_eq!(r.end().as_ref(), Some(m));
    }

    #[test]
    fn test_relationship_to_unseen_endpoint_is_dropped() {
        let mut h = Hydrator::new(metadata());
        let mapped = h.hydrate_row(&row(
            &["u", "r"],
            vec![user(1, "Vince"), json!([rel(11, "FRIENDS", 3, 1)])],
        ));
        let u = mapped[0].1.as_entity().unwrap();
        assert!(u.related("friends").is_none());
        assert_eq!(mapped[1].1, MappedValue::List(vec![]));
    }

    #[test]
    fn test_wiring_happens_once_per_relationship() {
        let mut h = Hydrator::new(metadata());
        let r = row(
            &["a", "f", "b"],
            vec![user(1, "a"), rel(5, "FRIENDS", 1, 2), user(2, "b")],
        );
        let first = h.hydrate_row(&r);
        h.hydrate_row(&r);
        let a = first[0].1.as_entity().unwrap();
        assert_eq!(a.related("friends").unwrap().len(), 1);
        assert_eq!(
            first[1].1.as_relationship_model().map(|m| m.rel_type.as_str()),
            Some("FRIENDS")
        );
    }

    #[test]
    fn test_unmapped_node_is_generic_and_its_relationship_dropped() {
        let mut h = Hydrator::new(metadata());
        let mapped = h.hydrate_row(&row(
            &["u", "r", "p"],
            vec![
                user(1, "a"),
                rel(6, "OWNS", 1, 9),
                json!({"_nexus_id": 9, "_nexus_labels": ["Pet"], "name": "Rex"}),
            ],
        ));
        let pet = mapped[2].1.as_node_model().unwrap();
        assert_eq!(pet.property("name"), MappedValue::from("Rex"));
        assert!(mapped[1].1.is_null());
        assert_eq!(h.object_count(), 1);
    }

    #[test]
    fn test_root_entities_filters_by_class_and_skips_nested_lists() {
        let mut h = Hydrator::new(metadata());
        let r = row(
            &["u", "m", "nested"],
            vec![user(1, "a"), movie(2, "m"), json!([[user(3, "deep")]])],
        );
        h.register_row(&r);
        let users = h.root_entities(&r, "t::User");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id(), 1);
    }
}
