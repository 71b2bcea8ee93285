//! Mapping metadata: registered domain classes and label/type resolution
//!
//! Classes are registered once, up front, and keyed by their fully-qualified
//! name (`module::Name`). Node classes are bound to a label set, relationship
//! entity classes to a relationship type.
//!
//! Resolution rules for a node's label set:
//! 1. a class whose effective label set equals the node's labels exactly;
//! 2. otherwise the most specific class whose whole label set is contained in
//!    the node's labels (registration order breaks ties);
//! 3. otherwise nothing, and the node stays generic.

use crate::error::{OgmError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Relationship direction, as seen from the class declaring the field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Field owner is the start node
    Outgoing,
    /// Field owner is the end node
    Incoming,
    /// Either side
    Both,
}

impl Direction {
    fn accepts_outgoing(self) -> bool {
        matches!(self, Direction::Outgoing | Direction::Both)
    }

    fn accepts_incoming(self) -> bool {
        matches!(self, Direction::Incoming | Direction::Both)
    }
}

/// A relationship-valued field on a domain class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipField {
    /// Field name
    pub name: String,
    /// Relationship type
    pub rel_type: String,
    /// Direction relative to the owner
    pub direction: Direction,
    /// Qualified name of the element class (a node class, or a relationship
    /// entity class)
    pub target: String,
}

/// Kind of a registered class
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassKind {
    /// Bound to a set of node labels
    Node,
    /// Relationship entity bound to a relationship type
    Relationship {
        /// Relationship type
        rel_type: String,
        /// Qualified name of the start node class, if constrained
        start: Option<String>,
        /// Qualified name of the end node class, if constrained
        end: Option<String>,
    },
}

/// Description of a registered domain class
#[derive(Debug, Clone)]
pub struct ClassInfo {
    name: String,
    simple_name: String,
    kind: ClassKind,
    own_labels: Vec<String>,
    labels: Vec<String>,
    superclass: Option<String>,
    own_fields: Vec<RelationshipField>,
    fields: Vec<RelationshipField>,
}

impl ClassInfo {
    /// Declare a node class; its label defaults to the simple name
    pub fn node(name: impl Into<String>) -> Self {
        Self::new(name.into(), ClassKind::Node)
    }

    /// Declare a relationship entity class bound to `rel_type`
    pub fn relationship(name: impl Into<String>, rel_type: impl Into<String>) -> Self {
        Self::new(
            name.into(),
            ClassKind::Relationship {
                rel_type: rel_type.into(),
                start: None,
                end: None,
            },
        )
    }

    fn new(name: String, kind: ClassKind) -> Self {
        let simple_name = name.rsplit("::").next().unwrap_or(&name).to_string();
        let own_labels = match kind {
            ClassKind::Node => vec![simple_name.clone()],
            ClassKind::Relationship { .. } => Vec::new(),
        };
        Self {
            name,
            simple_name,
            kind,
            own_labels,
            labels: Vec::new(),
            superclass: None,
            own_fields: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Replace the primary label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        if let Some(first) = self.own_labels.first_mut() {
            *first = label.into();
        }
        self
    }

    /// Require an additional label
    pub fn additional_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !self.own_labels.contains(&label) {
            self.own_labels.push(label);
        }
        self
    }

    /// Inherit labels and relationship fields from a registered superclass
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Declare a relationship field
    pub fn relationship_field(
        mut self,
        name: impl Into<String>,
        rel_type: impl Into<String>,
        direction: Direction,
        target: impl Into<String>,
    ) -> Self {
        self.own_fields.push(RelationshipField {
            name: name.into(),
            rel_type: rel_type.into(),
            direction,
            target: target.into(),
        });
        self
    }

    /// Constrain the endpoint classes of a relationship entity
    pub fn endpoints(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        if let ClassKind::Relationship {
            start: s, end: e, ..
        } = &mut self.kind
        {
            *s = Some(start.into());
            *e = Some(end.into());
        }
        self
    }

    /// Fully-qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unqualified name
    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    /// Class kind
    pub fn kind(&self) -> &ClassKind {
        &self.kind
    }

    /// Whether this is a relationship entity class
    pub fn is_relationship_entity(&self) -> bool {
        matches!(self.kind, ClassKind::Relationship { .. })
    }

    /// Relationship type for relationship entity classes
    pub fn rel_type(&self) -> Option<&str> {
        match &self.kind {
            ClassKind::Relationship { rel_type, .. } => Some(rel_type),
            ClassKind::Node => None,
        }
    }

    /// Effective label set, inherited labels first
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Direct superclass, if any
    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    /// Effective relationship fields, inherited ones included
    pub fn fields(&self) -> &[RelationshipField] {
        &self.fields
    }

    /// Fields that receive an outgoing relationship of `rel_type`
    pub fn outgoing_fields<'a>(
        &'a self,
        rel_type: &'a str,
    ) -> impl Iterator<Item = &'a RelationshipField> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.rel_type == rel_type && f.direction.accepts_outgoing())
    }

    /// Fields that receive an incoming relationship of `rel_type`
    pub fn incoming_fields<'a>(
        &'a self,
        rel_type: &'a str,
    ) -> impl Iterator<Item = &'a RelationshipField> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.rel_type == rel_type && f.direction.accepts_incoming())
    }
}

/// Builder collecting class registrations
#[derive(Debug, Default)]
pub struct MetaDataBuilder {
    classes: Vec<ClassInfo>,
}

impl MetaDataBuilder {
    /// Register a class
    pub fn register(mut self, class: ClassInfo) -> Self {
        self.classes.push(class);
        self
    }

    /// Validate registrations and build the registry
    pub fn build(self) -> Result<MetaData> {
        let mut index = HashMap::new();
        for (i, class) in self.classes.iter().enumerate() {
            if index.insert(class.name.clone(), i).is_some() {
                return Err(OgmError::registration(format!(
                    "class '{}' registered twice",
                    class.name
                )));
            }
        }

        for class in &self.classes {
            if let Some(parent) = &class.superclass {
                let Some(&p) = index.get(parent) else {
                    return Err(OgmError::registration(format!(
                        "class '{}' extends unknown class '{}'",
                        class.name, parent
                    )));
                };
                if self.classes[p].is_relationship_entity() != class.is_relationship_entity() {
                    return Err(OgmError::registration(format!(
                        "class '{}' and its superclass '{}' are of different kinds",
                        class.name, parent
                    )));
                }
            }
            for field in &class.own_fields {
                if !index.contains_key(&field.target) {
                    return Err(OgmError::registration(format!(
                        "field '{}.{}' targets unknown class '{}'",
                        class.name, field.name, field.target
                    )));
                }
            }
            if let ClassKind::Relationship { start, end, .. } = &class.kind {
                for endpoint in [start, end].into_iter().flatten() {
                    if !index.contains_key(endpoint) {
                        return Err(OgmError::registration(format!(
                            "relationship entity '{}' references unknown class '{}'",
                            class.name, endpoint
                        )));
                    }
                }
            }
        }

        let mut resolved = Vec::with_capacity(self.classes.len());
        for (i, class) in self.classes.iter().enumerate() {
            let chain = ancestry(&self.classes, &index, i)?;
            let mut labels: Vec<String> = Vec::new();
            let mut fields: Vec<RelationshipField> = Vec::new();
            for &ancestor in chain.iter().rev() {
                for label in &self.classes[ancestor].own_labels {
                    if !labels.contains(label) {
                        labels.push(label.clone());
                    }
                }
                fields.extend(self.classes[ancestor].own_fields.iter().cloned());
            }
            let mut class = class.clone();
            class.labels = labels;
            class.fields = fields;
            resolved.push(Arc::new(class));
        }

        let mut by_rel_type: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, class) in resolved.iter().enumerate() {
            if let Some(rel_type) = class.rel_type() {
                by_rel_type.entry(rel_type.to_string()).or_default().push(i);
            }
        }

        tracing::debug!("Mapping metadata built with {} classes", resolved.len());

        Ok(MetaData {
            classes: resolved,
            by_name: index,
            by_rel_type,
        })
    }
}

/// Class indices from `start` up to its root superclass
fn ancestry(
    classes: &[ClassInfo],
    index: &HashMap<String, usize>,
    start: usize,
) -> Result<Vec<usize>> {
    let mut chain = vec![start];
    let mut current = start;
    while let Some(parent) = &classes[current].superclass {
        let p = index[parent];
        if chain.contains(&p) {
            return Err(OgmError::registration(format!(
                "inheritance cycle through '{}'",
                classes[p].name
            )));
        }
        chain.push(p);
        current = p;
    }
    Ok(chain)
}

/// Registry of domain classes
#[derive(Debug)]
pub struct MetaData {
    classes: Vec<Arc<ClassInfo>>,
    by_name: HashMap<String, usize>,
    by_rel_type: HashMap<String, Vec<usize>>,
}

impl MetaData {
    /// Start a registration
    pub fn builder() -> MetaDataBuilder {
        MetaDataBuilder::default()
    }

    /// Registry with no classes; every entity maps to a generic model
    pub fn empty() -> Self {
        Self {
            classes: Vec::new(),
            by_name: HashMap::new(),
            by_rel_type: HashMap::new(),
        }
    }

    /// Look up a class by fully-qualified name
    pub fn class(&self, name: &str) -> Option<&Arc<ClassInfo>> {
        self.by_name.get(name).map(|&i| &self.classes[i])
    }

    /// Whether a class is registered
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All classes sharing an unqualified name
    pub fn classes_by_simple_name(&self, simple_name: &str) -> Vec<&Arc<ClassInfo>> {
        self.classes
            .iter()
            .filter(|c| c.simple_name == simple_name)
            .collect()
    }

    /// All registered classes in registration order
    pub fn classes(&self) -> impl Iterator<Item = &Arc<ClassInfo>> {
        self.classes.iter()
    }

    /// Resolve a node label set to a node class
    pub fn resolve_node(&self, labels: &[String]) -> Option<&Arc<ClassInfo>> {
        if labels.is_empty() {
            return None;
        }
        let label_set: HashSet<&str> = labels.iter().map(String::as_str).collect();
        let node_classes = || {
            self.classes
                .iter()
                .filter(|c| matches!(c.kind, ClassKind::Node) && !c.labels.is_empty())
        };

        if let Some(exact) = node_classes().find(|c| {
            c.labels.len() == label_set.len()
                && c.labels.iter().all(|l| label_set.contains(l.as_str()))
        }) {
            return Some(exact);
        }

        let mut best: Option<&Arc<ClassInfo>> = None;
        for class in node_classes() {
            if class.labels.iter().all(|l| label_set.contains(l.as_str()))
                && best.is_none_or(|b| class.labels.len() > b.labels.len())
            {
                best = Some(class);
            }
        }
        best
    }

    /// Resolve a relationship type to a relationship entity class, honouring
    /// endpoint constraints against the endpoints' resolved classes
    pub fn resolve_relationship(
        &self,
        rel_type: &str,
        start_class: &str,
        end_class: &str,
    ) -> Option<&Arc<ClassInfo>> {
        let candidates = self.by_rel_type.get(rel_type)?;
        candidates.iter().map(|&i| &self.classes[i]).find(|class| {
            let ClassKind::Relationship { start, end, .. } = &class.kind else {
                return false;
            };
            start
                .as_deref()
                .is_none_or(|s| self.is_assignable(start_class, s))
                && end.as_deref().is_none_or(|e| self.is_assignable(end_class, e))
        })
    }

    /// Whether an instance of `actual` may be handed out as `target`
    pub fn is_assignable(&self, actual: &str, target: &str) -> bool {
        let mut current = Some(actual);
        while let Some(name) = current {
            if name == target {
                return true;
            }
            current = self.class(name).and_then(|c| c.superclass());
        }
        false
    }
}
