//! Object graph arena and entity handles
//!
//! Domain objects hydrated from one result live in a single [`ObjectGraph`].
//! Relationship fields hold arena indices, so cycles (mutual friends, linked
//! lists, a rating reachable from both its user and its movie) need no
//! reference counting between objects. Callers see [`EntityRef`] handles;
//! two handles are equal exactly when they denote the same instance.

use crate::coerce::{property_value, FromMapped, MappedValue};
use crate::error::Result;
use crate::metadata::{ClassInfo, MetaData};
use crate::value::{NodeRef, RelationshipRef};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Node that matched no registered class
#[derive(Debug, Clone, PartialEq)]
pub struct NodeModel {
    /// Store identity
    pub id: u64,
    /// Labels as stored
    pub labels: Vec<String>,
    /// Properties
    pub properties: BTreeMap<String, MappedValue>,
}

impl NodeModel {
    pub(crate) fn from_wire(node: &NodeRef) -> Self {
        Self {
            id: node.id,
            labels: node.labels.clone(),
            properties: node
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), property_value(v)))
                .collect(),
        }
    }

    /// Property value, null when absent
    pub fn property(&self, name: &str) -> MappedValue {
        self.properties.get(name).cloned().unwrap_or(MappedValue::Null)
    }
}

/// Relationship that matched no registered relationship entity class
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipModel {
    /// Store identity
    pub id: u64,
    /// Relationship type
    pub rel_type: String,
    /// Start node identity
    pub start_id: u64,
    /// End node identity
    pub end_id: u64,
    /// Properties
    pub properties: BTreeMap<String, MappedValue>,
}

impl RelationshipModel {
    pub(crate) fn from_wire(rel: &RelationshipRef) -> Self {
        Self {
            id: rel.id,
            rel_type: rel.rel_type.clone(),
            start_id: rel.start_id,
            end_id: rel.end_id,
            properties: rel
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), property_value(v)))
                .collect(),
        }
    }

    /// Property value, null when absent
    pub fn property(&self, name: &str) -> MappedValue {
        self.properties.get(name).cloned().unwrap_or(MappedValue::Null)
    }
}

/// Path with its elements mapped
#[derive(Debug, Clone, PartialEq)]
pub struct MappedPath {
    /// Nodes in traversal order
    pub nodes: Vec<MappedValue>,
    /// Relationships in traversal order; unresolved ones are omitted
    pub relationships: Vec<MappedValue>,
}

#[derive(Debug)]
pub(crate) struct DomainObject {
    class: Arc<ClassInfo>,
    id: u64,
    labels: Vec<String>,
    properties: BTreeMap<String, MappedValue>,
    fields: BTreeMap<String, Vec<usize>>,
    endpoints: Option<(usize, usize)>,
}

impl DomainObject {
    pub(crate) fn from_node(class: Arc<ClassInfo>, node: &NodeRef) -> Self {
        Self {
            class,
            id: node.id,
            labels: node.labels.clone(),
            properties: node
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), property_value(v)))
                .collect(),
            fields: BTreeMap::new(),
            endpoints: None,
        }
    }

    pub(crate) fn from_relationship(
        class: Arc<ClassInfo>,
        rel: &RelationshipRef,
        start: usize,
        end: usize,
    ) -> Self {
        Self {
            class,
            id: rel.id,
            labels: Vec::new(),
            properties: rel
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), property_value(v)))
                .collect(),
            fields: BTreeMap::new(),
            endpoints: Some((start, end)),
        }
    }

    fn attach(&mut self, field: &str, element: usize) {
        let slot = self.fields.entry(field.to_string()).or_default();
        if !slot.contains(&element) {
            slot.push(element);
        }
    }
}

/// Arena of domain objects hydrated within one result
#[derive(Debug)]
pub(crate) struct ObjectGraph {
    metadata: Arc<MetaData>,
    objects: Vec<DomainObject>,
}

impl ObjectGraph {
    pub(crate) fn new(metadata: Arc<MetaData>) -> Self {
        Self {
            metadata,
            objects: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, object: DomainObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub(crate) fn class_of(&self, index: usize) -> &Arc<ClassInfo> {
        &self.objects[index].class
    }

    pub(crate) fn is_instance_of(&self, index: usize, class: &str) -> bool {
        self.metadata
            .is_assignable(self.objects[index].class.name(), class)
    }

    /// Attach one relationship to the fields of both endpoints. Returns the
    /// number of fields that received an element.
    pub(crate) fn wire(
        &mut self,
        rel_type: &str,
        start: usize,
        end: usize,
        entity: Option<usize>,
    ) -> usize {
        let start_class = Arc::clone(&self.objects[start].class);
        let end_class = Arc::clone(&self.objects[end].class);
        let entity_class = entity.map(|i| Arc::clone(&self.objects[i].class));
        let mut attached = 0;

        for field in start_class.outgoing_fields(rel_type) {
            if let Some(element) =
                self.element_for(&field.target, entity, entity_class.as_deref(), end, &end_class)
            {
                self.objects[start].attach(&field.name, element);
                attached += 1;
            }
        }
        for field in end_class.incoming_fields(rel_type) {
            if let Some(element) = self.element_for(
                &field.target,
                entity,
                entity_class.as_deref(),
                start,
                &start_class,
            ) {
                self.objects[end].attach(&field.name, element);
                attached += 1;
            }
        }
        attached
    }

    fn element_for(
        &self,
        target: &str,
        entity: Option<usize>,
        entity_class: Option<&ClassInfo>,
        other: usize,
        other_class: &ClassInfo,
    ) -> Option<usize> {
        if let (Some(entity), Some(class)) = (entity, entity_class) {
            if self.metadata.is_assignable(class.name(), target) {
                return Some(entity);
            }
        }
        self.metadata
            .is_assignable(other_class.name(), target)
            .then_some(other)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }
}

/// Handle to a hydrated domain object
#[derive(Clone)]
pub struct EntityRef {
    graph: Arc<RwLock<ObjectGraph>>,
    index: usize,
}

impl EntityRef {
    pub(crate) fn new(graph: Arc<RwLock<ObjectGraph>>, index: usize) -> Self {
        Self { graph, index }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    fn sibling(&self, index: usize) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            index,
        }
    }

    /// Store identity
    pub fn id(&self) -> u64 {
        self.graph.read().objects[self.index].id
    }

    /// Resolved class
    pub fn class(&self) -> Arc<ClassInfo> {
        Arc::clone(&self.graph.read().objects[self.index].class)
    }

    /// Fully-qualified class name
    pub fn class_name(&self) -> String {
        self.graph.read().objects[self.index].class.name().to_string()
    }

    /// Labels as stored; empty for relationship entities
    pub fn labels(&self) -> Vec<String> {
        self.graph.read().objects[self.index].labels.clone()
    }

    /// Property value, null when absent
    pub fn property(&self, name: &str) -> MappedValue {
        self.graph.read().objects[self.index]
            .properties
            .get(name)
            .cloned()
            .unwrap_or(MappedValue::Null)
    }

    /// Property converted into a requested type
    pub fn property_as<T: FromMapped>(&self, name: &str) -> Result<T> {
        T::from_mapped(self.property(name))
    }

    /// All properties
    pub fn properties(&self) -> BTreeMap<String, MappedValue> {
        self.graph.read().objects[self.index].properties.clone()
    }

    /// Elements wired into a relationship field. `None` when nothing in the
    /// result populated the field.
    pub fn related(&self, field: &str) -> Option<Vec<EntityRef>> {
        let indices = self.graph.read().objects[self.index]
            .fields
            .get(field)
            .cloned()?;
        Some(indices.into_iter().map(|i| self.sibling(i)).collect())
    }

    /// Start node of a relationship entity
    pub fn start(&self) -> Option<EntityRef> {
        let endpoints = self.graph.read().objects[self.index].endpoints;
        endpoints.map(|(start, _)| self.sibling(start))
    }

    /// End node of a relationship entity
    pub fn end(&self) -> Option<EntityRef> {
        let endpoints = self.graph.read().objects[self.index].endpoints;
        endpoints.map(|(_, end)| self.sibling(end))
    }

    /// Whether this is a relationship entity
    pub fn is_relationship_entity(&self) -> bool {
        self.graph.read().objects[self.index].endpoints.is_some()
    }

    /// Whether the instance may be handed out as `class`
    pub fn is_instance_of(&self, class: &str) -> bool {
        self.graph.read().is_instance_of(self.index, class)
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.graph, &other.graph) && self.index == other.index
    }
}

impl Eq for EntityRef {}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.graph.try_read() {
            Some(graph) => {
                let object = &graph.objects[self.index];
                write!(f, "{}#{}", object.class.simple_name(), object.id)
            }
            None => write!(f, "EntityRef(@{})", self.index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ClassInfo, Direction};
    use crate::value::{Properties, Value};

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

    fn node(id: u64, label: &str, name: &str) -> NodeRef {
        let mut props = Properties::new();
        props.insert("name".to_string(), Value::from(name));
        NodeRef::new(id, vec![label.to_string()], props)
    }

    #[test]
    fn test_wire_plain_relationship_to_end_node() {
        let md = metadata();
        let user = md.class("t::User").unwrap().clone();
        let mut graph = ObjectGraph::new(md);
        let a = graph.insert(DomainObject::from_node(user.clone(), &node(1, "User", "a")));
        let b = graph.insert(DomainObject::from_node(user, &node(2, "User", "b")));
        assert_eq!(graph.wire("FRIENDS", a, b, None), 1);

        let graph = Arc::new(RwLock::new(graph));
        let a_ref = EntityRef::new(Arc::clone(&graph), a);
        let friends = a_ref.related("friends").unwrap();
        assert_eq!(friends, vec![EntityRef::new(Arc::clone(&graph), b)]);
        assert!(EntityRef::new(graph, b).related("friends").is_none());
    }

    #[test]
    fn test_wire_relationship_entity_into_both_endpoints() {
        let md = metadata();
        let user = md.class("t::User").unwrap().clone();
        let movie = md.class("t::Movie").unwrap().clone();
        let rating = md.class("t::Rating").unwrap().clone();
        let rel = RelationshipRef {
            id: 10,
            rel_type: "RATED".to_string(),
            start_id: 1,
            end_id: 2,
            properties: Properties::from([("stars".to_string(), Value::Integer(5))]),
        };
        let mut graph = ObjectGraph::new(md);
        let u = graph.insert(DomainObject::from_node(user, &node(1, "User", "u")));
        let m = graph.insert(DomainObject::from_node(movie, &node(2, "Movie", "m")));
        let r = graph.insert(DomainObject::from_relationship(rating, &rel, u, m));
        assert_eq!(graph.wire("RATED", u, m, Some(r)), 2);
        assert_eq!(graph.len(), 3);

        let graph = Arc::new(RwLock::new(graph));
        let from_user = EntityRef::new(Arc::clone(&graph), u).related("ratings").unwrap();
        let from_movie = EntityRef::new(Arc::clone(&graph), m).related("ratings").unwrap();
        assert_eq!(from_user, from_movie);
        assert_eq!(from_user[0].property_as::<i64>("stars").unwrap(), 5);
        assert_eq!(from_user[0].start().unwrap().id(), 1);
        assert_eq!(from_user[0].end().unwrap().id(), 2);
        assert!(from_user[0].is_relationship_entity());
    }

    #[test]
    fn test_handles_from_different_graphs_differ() {
        let md = metadata();
        let user = md.class("t::User").unwrap().clone();
        let mut g1 = ObjectGraph::new(Arc::clone(&md));
        let mut g2 = ObjectGraph::new(md);
        g1.insert(DomainObject::from_node(user.clone(), &node(1, "User", "a")));
        g2.insert(DomainObject::from_node(user, &node(1, "User", "a")));
        let a = EntityRef::new(Arc::new(RwLock::new(g1)), 0);
        let b = EntityRef::new(Arc::new(RwLock::new(g2)), 0);
        assert_ne!(a, b);
        assert_eq!(a.id(), b.id());
        assert_eq!(format!("{:?}", a), "User#1");
    }
}
