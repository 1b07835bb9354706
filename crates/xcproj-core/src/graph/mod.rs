//! The project object graph: nodes keyed by identifier, linked only by
//! identifier values.
//!
//! The graph owns every node. Links between nodes are [`Value::Ref`]
//! entries resolved through the graph, never direct handles, and every
//! mutation checks that the references it introduces resolve to a live
//! node of an allowed kind before any state changes. A reverse index
//! (referent to referrers) backs integrity checks on removal.

pub mod comment;
pub mod node;
pub mod schema;
pub mod value;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use thiserror::Error;
use tracing::debug;

use self::node::{Fields, Kind, Node};
use self::schema::{field_spec, field_type, required_fields, FieldType};
use self::value::{Dict, Value};
use crate::id::{IdGenerator, Identifier, RandomIds};

/// Errors raised by graph construction, lookup and mutation.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(Identifier),

    #[error("duplicate node id: {0}")]
    DuplicateNode(Identifier),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("dangling reference from {kind}.{field} to {target}")]
    DanglingReference {
        kind: Kind,
        field: String,
        target: Identifier,
    },

    #[error("node {id} is still referenced by {} node(s)", .referrers.len())]
    IntegrityViolation {
        id: Identifier,
        referrers: Vec<Identifier>,
    },

    #[error("cannot remove the root object {0}")]
    RootObject(Identifier),

    #[error("root object {0} is not a PBXProject")]
    InvalidRoot(Identifier),

    #[error("field {field} may not reference {target} ({found}); expected one of {expected}")]
    KindMismatch {
        field: String,
        target: Identifier,
        found: Kind,
        expected: String,
    },

    #[error("field {kind}.{field} expects a {expected}")]
    FieldType {
        kind: Kind,
        field: String,
        expected: &'static str,
    },

    #[error("required field {kind}.{field} is missing")]
    MissingField { kind: Kind, field: String },

    #[error("field {field} of {id} is not a list")]
    NotAList { id: Identifier, field: String },

    #[error("not found: {0}")]
    NotFound(String),

    /// Several independent problems found while assembling a graph.
    #[error("{} problems in object graph", .0.len())]
    Invalid(Vec<GraphError>),
}

impl GraphError {
    /// The individual problems this error stands for.
    pub fn into_problems(self) -> Vec<GraphError> {
        match self {
            GraphError::Invalid(problems) => problems,
            other => vec![other],
        }
    }
}

/// Top-level entries of the document other than `objects` and
/// `rootObject`, plus the leading header line.
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    /// First line of the file, without its newline.
    pub header: String,
    /// `archiveVersion`, `classes`, `objectVersion` and any other
    /// top-level keys, carried through unchanged.
    pub entries: Dict,
}

impl Archive {
    pub const DEFAULT_HEADER: &'static str = "// !$*UTF8*$!";

    pub fn object_version(&self) -> Option<&str> {
        self.entries.get("objectVersion").and_then(Value::as_str)
    }
}

impl Default for Archive {
    fn default() -> Self {
        let mut entries = Dict::new();
        entries.insert("archiveVersion".into(), Value::string("1"));
        entries.insert("classes".into(), Value::Dict(Dict::new()));
        entries.insert("objectVersion".into(), Value::string("46"));
        Self {
            header: Self::DEFAULT_HEADER.to_string(),
            entries,
        }
    }
}

/// Saved contents of a [`Graph`], taken by [`Graph::checkpoint`].
#[derive(Debug, Clone)]
pub struct Checkpoint {
    nodes: HashMap<Identifier, Node>,
    listing: BTreeSet<(Kind, Identifier)>,
    incoming: HashMap<Identifier, HashMap<Identifier, usize>>,
    retired: HashSet<Identifier>,
    root: Option<Identifier>,
    project_name: Option<String>,
    archive: Archive,
}

/// The object graph of one project document.
pub struct Graph {
    nodes: HashMap<Identifier, Node>,
    /// Canonical listing order: by kind, then by identifier text.
    listing: BTreeSet<(Kind, Identifier)>,
    /// Referent -> referrer -> number of references held.
    incoming: HashMap<Identifier, HashMap<Identifier, usize>>,
    /// Identifiers removed from this instance; never handed out again.
    retired: HashSet<Identifier>,
    root: Option<Identifier>,
    project_name: Option<String>,
    archive: Archive,
    generator: Box<dyn IdGenerator>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .field("project_name", &self.project_name)
            .field("generator", &self.generator)
            .finish()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Create an empty graph drawing random identifiers.
    pub fn new() -> Self {
        Self::with_generator(Box::new(RandomIds))
    }

    /// Create an empty graph with an injected identifier source.
    pub fn with_generator(generator: Box<dyn IdGenerator>) -> Self {
        Self {
            nodes: HashMap::new(),
            listing: BTreeSet::new(),
            incoming: HashMap::new(),
            retired: HashSet::new(),
            root: None,
            project_name: None,
            archive: Archive::default(),
            generator,
        }
    }

    /// Assemble a graph from fully-formed nodes, as a parser does.
    ///
    /// Nodes may reference each other in any order; the referential
    /// closure and root are checked once everything is inserted. On error
    /// no graph is returned; more than one problem comes back as
    /// [`GraphError::Invalid`].
    pub fn from_parts(
        archive: Archive,
        nodes: Vec<Node>,
        root: Identifier,
        generator: Box<dyn IdGenerator>,
    ) -> Result<Self, GraphError> {
        let mut graph = Self::with_generator(generator);
        graph.archive = archive;
        for node in nodes {
            if graph.nodes.contains_key(&node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
            graph.listing.insert((node.kind, node.id.clone()));
            graph.nodes.insert(node.id.clone(), node);
        }
        if let Err(mut problems) = graph.validate() {
            return Err(match problems.len() {
                1 => problems.remove(0),
                _ => GraphError::Invalid(problems),
            });
        }
        let ids: Vec<Identifier> = graph.nodes.keys().cloned().collect();
        for id in ids {
            let values: Vec<Value> = graph.nodes[&id].fields.values().cloned().collect();
            for value in &values {
                graph.link(&id, value);
            }
        }
        graph.set_root(root)?;
        Ok(graph)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn node(&self, id: &Identifier) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.nodes.contains_key(id)
    }

    /// Look up a node, failing with `NodeNotFound`.
    pub fn expect_node(&self, id: &Identifier) -> Result<&Node, GraphError> {
        self.nodes
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))
    }

    /// Iterate over all nodes in canonical listing order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.listing.iter().filter_map(|(_, id)| self.nodes.get(id))
    }

    /// Lazily iterate over nodes matching `predicate`, in listing order.
    pub fn find_nodes<'a, P>(&'a self, mut predicate: P) -> impl Iterator<Item = &'a Node> + 'a
    where
        P: FnMut(&Node) -> bool + 'a,
    {
        self.nodes().filter(move |n| predicate(n))
    }

    /// Nodes of one kind, ordered by identifier.
    pub fn nodes_of_kind(&self, kind: Kind) -> impl Iterator<Item = &Node> + '_ {
        self.listing
            .range((kind, Identifier::min())..)
            .take_while(move |(k, _)| *k == kind)
            .filter_map(|(_, id)| self.nodes.get(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes holding at least one reference to `id`, ordered by identifier.
    pub fn referrers(&self, id: &Identifier) -> Vec<Identifier> {
        let mut out: Vec<Identifier> = self
            .incoming
            .get(id)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    pub fn root(&self) -> Option<&Identifier> {
        self.root.as_ref()
    }

    /// The root PBXProject node.
    pub fn root_node(&self) -> Result<&Node, GraphError> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| GraphError::NotFound("root object".into()))?;
        self.expect_node(root)
    }

    pub fn set_root(&mut self, id: Identifier) -> Result<(), GraphError> {
        let node = self.expect_node(&id)?;
        if node.kind != Kind::PBXProject {
            return Err(GraphError::InvalidRoot(id));
        }
        self.root = Some(id);
        Ok(())
    }

    /// Display name of the project itself (the `.xcodeproj` stem).
    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    pub fn set_project_name(&mut self, name: impl Into<String>) {
        self.project_name = Some(name.into());
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn archive_mut(&mut self) -> &mut Archive {
        &mut self.archive
    }

    /// Save the current contents so a failed edit can be undone.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            nodes: self.nodes.clone(),
            listing: self.listing.clone(),
            incoming: self.incoming.clone(),
            retired: self.retired.clone(),
            root: self.root.clone(),
            project_name: self.project_name.clone(),
            archive: self.archive.clone(),
        }
    }

    /// Put back the contents saved in `checkpoint`. Identifiers handed out
    /// since then stay retired.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        let Checkpoint {
            nodes,
            listing,
            incoming,
            mut retired,
            root,
            project_name,
            archive,
        } = checkpoint;
        retired.extend(
            self.nodes
                .keys()
                .filter(|id| !nodes.contains_key(*id))
                .cloned(),
        );
        retired.extend(self.retired.drain());
        debug!(dropped = self.nodes.len().saturating_sub(nodes.len()), "rolled back graph");
        self.nodes = nodes;
        self.listing = listing;
        self.incoming = incoming;
        self.retired = retired;
        self.root = root;
        self.project_name = project_name;
        self.archive = archive;
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Allocate an identifier and insert a new node.
    ///
    /// Every reference in `fields` must already resolve.
    pub fn add_node(
        &mut self,
        kind: Kind,
        fields: Fields,
        comment: Option<String>,
    ) -> Result<Identifier, GraphError> {
        for name in required_fields(kind) {
            if !fields.contains_key(name) {
                return Err(GraphError::MissingField {
                    kind,
                    field: name.to_string(),
                });
            }
        }
        for (name, value) in &fields {
            self.check_value(kind, name, value)?;
        }

        let id = self.fresh_id();
        for value in fields.values() {
            self.link(&id, value);
        }
        self.listing.insert((kind, id.clone()));
        let mut node = Node::new(id.clone(), kind, fields);
        node.comment = comment;
        self.nodes.insert(id.clone(), node);
        debug!(%id, %kind, "added node");
        Ok(id)
    }

    /// Insert a node under its own identifier.
    ///
    /// The identifier must be free and never handed out before by this
    /// graph; references are checked as for [`Graph::add_node`].
    pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) || self.retired.contains(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        for name in required_fields(node.kind) {
            if !node.fields.contains_key(name) {
                return Err(GraphError::MissingField {
                    kind: node.kind,
                    field: name.to_string(),
                });
            }
        }
        for (name, value) in &node.fields {
            self.check_value(node.kind, name, value)?;
        }

        for value in node.fields.values() {
            self.link(&node.id, value);
        }
        self.listing.insert((node.kind, node.id.clone()));
        debug!(id = %node.id, kind = %node.kind, "inserted node");
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Remove a node nothing references any more.
    pub fn remove_node(&mut self, id: &Identifier) -> Result<Node, GraphError> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::NodeNotFound(id.clone()));
        }
        if self.root.as_ref() == Some(id) {
            return Err(GraphError::RootObject(id.clone()));
        }
        let referrers: Vec<Identifier> = self
            .referrers(id)
            .into_iter()
            .filter(|r| r != id)
            .collect();
        if !referrers.is_empty() {
            return Err(GraphError::IntegrityViolation {
                id: id.clone(),
                referrers,
            });
        }

        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        for value in node.fields.values() {
            self.unlink(id, value);
        }
        self.incoming.remove(id);
        self.listing.remove(&(node.kind, id.clone()));
        self.retired.insert(id.clone());
        debug!(%id, kind = %node.kind, "removed node");
        Ok(node)
    }

    /// Replace (or add) one field.
    pub fn set_field(
        &mut self,
        id: &Identifier,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<(), GraphError> {
        let value = value.into();
        let kind = self.expect_node(id)?.kind;
        self.check_value(kind, field, &value)?;

        self.link(id, &value);
        let old = self
            .nodes
            .get_mut(id)
            .and_then(|n| n.fields.insert(field.to_string(), value));
        if let Some(old) = old {
            self.unlink(id, &old);
        }
        Ok(())
    }

    /// Remove an optional field. Returns the previous value.
    pub fn unset_field(&mut self, id: &Identifier, field: &str) -> Result<Option<Value>, GraphError> {
        let kind = self.expect_node(id)?.kind;
        if field_spec(kind, field).is_some_and(|f| f.required) {
            return Err(GraphError::MissingField {
                kind,
                field: field.to_string(),
            });
        }
        let old = self.nodes.get_mut(id).and_then(|n| n.fields.remove(field));
        if let Some(old) = &old {
            self.unlink(id, old);
        }
        Ok(old)
    }

    /// Append `value` to a list field unless it is already present.
    ///
    /// Returns whether the list changed. A missing field is created.
    pub fn append_to_list(
        &mut self,
        id: &Identifier,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<bool, GraphError> {
        self.insert_into_list(id, field, None, value)
    }

    /// Insert `value` into a list field at `index` (or the end) unless it
    /// is already present.
    pub fn insert_into_list(
        &mut self,
        id: &Identifier,
        field: &str,
        index: Option<usize>,
        value: impl Into<Value>,
    ) -> Result<bool, GraphError> {
        let value = value.into();
        let node = self.expect_node(id)?;
        let kind = node.kind;
        self.check_element(kind, field, &value)?;
        match node.fields.get(field) {
            Some(Value::Array(items)) if items.contains(&value) => return Ok(false),
            Some(Value::Array(_)) | None => {}
            Some(_) => {
                return Err(GraphError::NotAList {
                    id: id.clone(),
                    field: field.to_string(),
                })
            }
        }

        self.link(id, &value);
        if let Some(node) = self.nodes.get_mut(id) {
            let slot = node
                .fields
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = slot {
                let at = index.unwrap_or(items.len()).min(items.len());
                items.insert(at, value);
            }
        }
        Ok(true)
    }

    /// Remove every occurrence of `value` from a list field.
    ///
    /// Returns whether anything was removed.
    pub fn remove_from_list(
        &mut self,
        id: &Identifier,
        field: &str,
        value: &Value,
    ) -> Result<bool, GraphError> {
        let kind = self.expect_node(id)?.kind;
        self.check_element(kind, field, value)?;

        let mut removed = 0usize;
        if let Some(node) = self.nodes.get_mut(id) {
            match node.fields.get_mut(field) {
                Some(Value::Array(items)) => {
                    let before = items.len();
                    items.retain(|v| v != value);
                    removed = before - items.len();
                }
                Some(_) => {
                    return Err(GraphError::NotAList {
                        id: id.clone(),
                        field: field.to_string(),
                    })
                }
                None => {}
            }
        }
        for _ in 0..removed {
            self.unlink(id, value);
        }
        Ok(removed > 0)
    }

    /// Set the advisory comment of a node.
    pub fn set_comment(&mut self, id: &Identifier, text: Option<String>) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        node.comment = text;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Check referential closure, field shapes and required fields of the
    /// whole graph.
    pub fn validate(&self) -> Result<(), Vec<GraphError>> {
        let mut errors = Vec::new();
        for node in self.nodes() {
            for name in required_fields(node.kind) {
                if !node.fields.contains_key(name) {
                    errors.push(GraphError::MissingField {
                        kind: node.kind,
                        field: name.to_string(),
                    });
                }
            }
            for (name, value) in &node.fields {
                if let Err(e) = self.check_value(node.kind, name, value) {
                    errors.push(e);
                }
            }
        }
        if let Some(root) = &self.root {
            match self.nodes.get(root) {
                Some(n) if n.kind == Kind::PBXProject => {}
                Some(_) => errors.push(GraphError::InvalidRoot(root.clone())),
                None => errors.push(GraphError::NodeNotFound(root.clone())),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn check_value(&self, kind: Kind, field: &str, value: &Value) -> Result<(), GraphError> {
        let ty = field_type(kind, field);
        if !ty.accepts(value) {
            return Err(GraphError::FieldType {
                kind,
                field: field.to_string(),
                expected: ty.describe(),
            });
        }
        self.check_refs(kind, field, ty, value)
    }

    /// Check a single list element against a list field's element type.
    fn check_element(&self, kind: Kind, field: &str, value: &Value) -> Result<(), GraphError> {
        let ty = field_type(kind, field);
        let ok = match ty {
            FieldType::RefList(_) => matches!(value, Value::Ref(_)),
            FieldType::StringList => matches!(value, Value::String(_)),
            FieldType::Any => true,
            _ => false,
        };
        if !ok {
            return Err(GraphError::FieldType {
                kind,
                field: field.to_string(),
                expected: ty.describe(),
            });
        }
        self.check_refs(kind, field, ty, value)
    }

    fn check_refs(
        &self,
        kind: Kind,
        field: &str,
        ty: FieldType,
        value: &Value,
    ) -> Result<(), GraphError> {
        let mut refs = Vec::new();
        value.collect_refs(&mut refs);
        for target in refs {
            let Some(referent) = self.nodes.get(target) else {
                return Err(GraphError::DanglingReference {
                    kind,
                    field: field.to_string(),
                    target: target.clone(),
                });
            };
            if let Some(allowed) = ty.ref_kinds() {
                if !allowed.contains(&referent.kind) {
                    return Err(GraphError::KindMismatch {
                        field: field.to_string(),
                        target: target.clone(),
                        found: referent.kind,
                        expected: allowed
                            .iter()
                            .map(|k| k.isa())
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn fresh_id(&mut self) -> Identifier {
        loop {
            let id = self.generator.generate();
            if !self.nodes.contains_key(&id) && !self.retired.contains(&id) {
                return id;
            }
            debug!(%id, "identifier collision, re-rolling");
        }
    }

    fn link(&mut self, from: &Identifier, value: &Value) {
        let mut refs = Vec::new();
        value.collect_refs(&mut refs);
        for target in refs {
            *self
                .incoming
                .entry(target.clone())
                .or_default()
                .entry(from.clone())
                .or_default() += 1;
        }
    }

    fn unlink(&mut self, from: &Identifier, value: &Value) {
        let mut refs = Vec::new();
        value.collect_refs(&mut refs);
        for target in refs {
            if let Some(map) = self.incoming.get_mut(target) {
                if let Some(count) = map.get_mut(from) {
                    *count -= 1;
                    if *count == 0 {
                        map.remove(from);
                    }
                }
                if map.is_empty() {
                    self.incoming.remove(target);
                }
            }
        }
    }
}
