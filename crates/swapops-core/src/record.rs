//! Raw collaborator records
//!
//! Collaborator responses are inconsistently shaped and may be cyclic: a
//! nested wrapper can reference a record that transitively references back
//! to it. Records are therefore stored in an arena of object/array nodes
//! where nested values are edges (`NodeId`), never owned subtrees.
//!
//! Cycles arrive on the wire through reference-preserving serialisers: an
//! object declares `"$id"` and other places point at it with an object whose
//! only key is `"$ref"`. Fixtures can also link nodes directly with
//! [`RecordArena::link`].

use crate::error::RecordError;
use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::collections::HashMap;

/// Keys under which list endpoints wrap their payload
const ENVELOPE_KEYS: &[&str] = &["data", "items", "records", "content", "list"];

const ID_KEY: &str = "$id";
const REF_KEY: &str = "$ref";

/// Index of a node inside its arena; the identity used for visited-sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// Field value of an object or array node
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Node(NodeId),
}

/// Arena node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Object(IndexMap<String, Field>),
    Array(Vec<Field>),
}

/// Render a JSON number the way ids are compared
pub(crate) fn number_to_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(|f| f.to_string()).unwrap_or_default()
    }
}

/// Where a pending `$ref` must be written once all `$id`s are known
enum RefSite {
    Key(NodeId, String),
    Index(NodeId, usize),
}

/// Arena of record nodes
#[derive(Debug, Clone, Default)]
pub struct RecordArena {
    nodes: Vec<Node>,
}

impl RecordArena {
    /// Create empty arena
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get node by id
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// View an object node as a record
    #[must_use]
    pub fn record(&self, id: NodeId) -> Option<Record<'_>> {
        match self.node(id)? {
            Node::Object(_) => Some(Record { arena: self, id }),
            Node::Array(_) => None,
        }
    }

    /// Allocate a new empty object node
    pub fn alloc_object(&mut self) -> NodeId {
        self.push(Node::Object(IndexMap::new()))
    }

    /// Set `key` on an object node to point at `target`
    ///
    /// Returns `false` when `object` is not an object node or `target` does
    /// not exist. Any existing value under `key` is replaced.
    pub fn link(&mut self, object: NodeId, key: &str, target: NodeId) -> bool {
        if target.0 >= self.nodes.len() {
            return false;
        }
        self.set(object, key, Field::Node(target))
    }

    /// Set a field on an object node
    pub fn set(&mut self, object: NodeId, key: &str, field: Field) -> bool {
        match self.nodes.get_mut(object.0) {
            Some(Node::Object(map)) => {
                map.insert(key.to_string(), field);
                true
            }
            _ => false,
        }
    }

    /// Ingest a tree-shaped JSON value, resolving `$id`/`$ref` pairs
    ///
    /// # Errors
    /// - `RecordError::DanglingReference` for a `$ref` without matching `$id`
    /// - `RecordError::DuplicateId` when an `$id` is declared twice
    pub fn ingest(&mut self, value: &Value) -> Result<Field, RecordError> {
        let mut ids = HashMap::new();
        let mut pending = Vec::new();
        let field = self.ingest_value(value, &mut ids, &mut pending)?;

        for (site, key) in pending {
            let target = *ids
                .get(&key)
                .ok_or_else(|| RecordError::DanglingReference(key.clone()))?;
            match site {
                RefSite::Key(node, name) => {
                    self.set(node, &name, Field::Node(target));
                }
                RefSite::Index(node, idx) => {
                    if let Some(Node::Array(items)) = self.nodes.get_mut(node.0) {
                        items[idx] = Field::Node(target);
                    }
                }
            }
        }
        Ok(field)
    }

    fn ingest_value(
        &mut self,
        value: &Value,
        ids: &mut HashMap<String, NodeId>,
        pending: &mut Vec<(RefSite, String)>,
    ) -> Result<Field, RecordError> {
        let field = match value {
            Value::Null => Field::Null,
            Value::Bool(b) => Field::Bool(*b),
            Value::Number(n) => Field::Number(n.clone()),
            Value::String(s) => Field::Text(s.clone()),
            Value::Array(items) => {
                let id = self.push(Node::Array(Vec::with_capacity(items.len())));
                for (idx, item) in items.iter().enumerate() {
                    let child = match ref_target(item) {
                        Some(key) => {
                            pending.push((RefSite::Index(id, idx), key));
                            Field::Null
                        }
                        None => self.ingest_value(item, ids, pending)?,
                    };
                    if let Some(Node::Array(slots)) = self.nodes.get_mut(id.0) {
                        slots.push(child);
                    }
                }
                Field::Node(id)
            }
            Value::Object(map) => {
                let id = self.alloc_object();
                if let Some(key) = map.get(ID_KEY).and_then(scalar_text) {
                    if ids.insert(key.clone(), id).is_some() {
                        return Err(RecordError::DuplicateId(key));
                    }
                }
                for (name, item) in map {
                    if name == ID_KEY {
                        continue;
                    }
                    let child = match ref_target(item) {
                        Some(key) => {
                            pending.push((RefSite::Key(id, name.clone()), key));
                            Field::Null
                        }
                        None => self.ingest_value(item, ids, pending)?,
                    };
                    self.set(id, name, child);
                }
                Field::Node(id)
            }
        };
        Ok(field)
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }
}

/// `$ref` key of an object that consists only of a reference
fn ref_target(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) if map.len() == 1 => map.get(REF_KEY).and_then(scalar_text),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_to_text(n)),
        _ => None,
    }
}

/// Borrowed view of an object node
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    arena: &'a RecordArena,
    id: NodeId,
}

impl<'a> Record<'a> {
    /// Node identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Owning arena
    #[inline]
    #[must_use]
    pub fn arena(&self) -> &'a RecordArena {
        self.arena
    }

    fn fields(&self) -> Option<&'a IndexMap<String, Field>> {
        match self.arena.node(self.id)? {
            Node::Object(map) => Some(map),
            Node::Array(_) => None,
        }
    }

    /// Raw field under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a Field> {
        self.fields()?.get(key)
    }

    /// Whether the key is present (even if null)
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Non-empty string-normalised scalar under `key`
    ///
    /// Strings are trimmed and numbers rendered as text; booleans, null,
    /// nested nodes and blank strings count as absent.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Field::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Field::Number(n) => Some(number_to_text(n)),
            Field::Null | Field::Bool(_) | Field::Node(_) => None,
        }
    }

    /// Embedded object under `key`
    #[must_use]
    pub fn object(&self, key: &str) -> Option<Record<'a>> {
        match self.get(key)? {
            Field::Node(id) => self.arena.record(*id),
            _ => None,
        }
    }

    /// Object elements of the array under `key`; empty when absent
    #[must_use]
    pub fn objects(&self, key: &str) -> Vec<Record<'a>> {
        let Some(Field::Node(id)) = self.get(key) else {
            return Vec::new();
        };
        match self.arena.node(*id) {
            Some(Node::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Field::Node(child) => self.arena.record(*child),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Follow `segments[..n-1]` as embedded objects, then read the last as text
    #[must_use]
    pub fn text_at(&self, segments: &[&str]) -> Option<String> {
        let (last, parents) = segments.split_last()?;
        self.object_at(parents)?.text(last)
    }

    /// Follow `segments` as embedded objects
    #[must_use]
    pub fn object_at(&self, segments: &[&str]) -> Option<Record<'a>> {
        segments
            .iter()
            .try_fold(*self, |current, segment| current.object(segment))
    }
}

/// Ordered list of records from a list endpoint, plus the arena holding them
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    arena: RecordArena,
    roots: Vec<NodeId>,
}

impl RecordSet {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a list payload
    ///
    /// Accepts a top-level array, an envelope object holding the array under
    /// one of `data`, `items`, `records`, `content`, `list` (one level of
    /// nesting allowed), or a single object treated as a one-record list.
    /// Non-object array elements are skipped.
    ///
    /// # Errors
    /// - `RecordError::NotAList` for scalar payloads
    /// - reference errors from [`RecordArena::ingest`]
    pub fn from_json(value: &Value) -> Result<Self, RecordError> {
        let mut set = Self::new();
        let Some(list) = unwrap_envelope(value)? else {
            return Ok(set);
        };
        let Field::Node(root) = set.arena.ingest(list)? else {
            return Err(RecordError::NotAList(kind_name(list)));
        };

        set.roots = match set.arena.node(root) {
            Some(Node::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Field::Node(id) if set.arena.record(*id).is_some() => Some(*id),
                    _ => None,
                })
                .collect(),
            Some(Node::Object(_)) => vec![root],
            None => Vec::new(),
        };
        Ok(set)
    }

    /// Parse a list payload from text
    ///
    /// # Errors
    /// See [`RecordSet::from_json`]
    pub fn from_json_str(text: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Build from an arena and explicit root object nodes
    ///
    /// Roots that are not object nodes are dropped.
    #[must_use]
    pub fn from_arena(arena: RecordArena, roots: Vec<NodeId>) -> Self {
        let roots = roots
            .into_iter()
            .filter(|id| arena.record(*id).is_some())
            .collect();
        Self { arena, roots }
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the set holds no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Records in payload order
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.roots.iter().filter_map(|id| self.arena.record(*id))
    }

    /// Backing arena
    #[inline]
    #[must_use]
    pub fn arena(&self) -> &RecordArena {
        &self.arena
    }
}

/// Locate the list inside a payload; `None` means an empty payload
fn unwrap_envelope(value: &Value) -> Result<Option<&Value>, RecordError> {
    match value {
        Value::Null => Ok(None),
        Value::Array(_) => Ok(Some(value)),
        Value::Object(map) => match ENVELOPE_KEYS.iter().find_map(|key| map.get(*key)) {
            Some(Value::Null) => Ok(None),
            Some(list @ Value::Array(_)) => Ok(Some(list)),
            Some(nested @ Value::Object(inner)) => Ok(Some(
                ENVELOPE_KEYS
                    .iter()
                    .find_map(|key| inner.get(*key).filter(|v| v.is_array()))
                    .unwrap_or(nested),
            )),
            _ => Ok(Some(value)),
        },
        other => Err(RecordError::NotAList(kind_name(other))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
