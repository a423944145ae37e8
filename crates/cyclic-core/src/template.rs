//! Cycle templates: immutable blueprints for one loop of the dungeon grammar.
//!
//! A [`CycleTemplate`] describes a Start room, a Goal room, two arcs (ordered
//! edge chains from Start to Goal) and a set of insertion seams, all in
//! template-local IDs. Templates are never mutated after construction; the
//! rewrite engine reads them to mint fresh output-graph fragments.
//!
//! Templates may also declare keys. Nodes can grant a declared key and edges
//! can be locked by one; both are resolved to global
//! [`KeyId`](crate::id::KeyId)s at instantiation time.
//!
//! Use [`TemplateBuilder`] to author templates; [`CycleTemplate::validate`]
//! checks every structural invariant.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cycle_type::CycleType;
use crate::edge::{LockType, TraversalKind};
use crate::error::CoreError;
use crate::id::{TEdgeId, TInsertionId, TKeyRef, TNodeId};
use crate::key::KeyType;
use crate::node::RoomTag;

/// Role of a node inside its template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateNodeKind {
    Normal,
    Start,
    Goal,
}

/// Which of the two arcs an edge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CycleArc {
    A,
    B,
}

/// Node blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateNode {
    pub kind: TemplateNodeKind,
    pub label: Option<String>,
    /// Tags copied verbatim onto every instance. Never contains
    /// [`RoomTag::KeyGrant`]; grants go through [`grants`](Self::grants).
    pub tags: Vec<RoomTag>,
    /// Template key this room grants, if any.
    pub grants: Option<TKeyRef>,
}

/// Lock blueprint on a template edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLock {
    pub key: TKeyRef,
    pub lock_type: LockType,
}

/// Edge blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEdge {
    pub from: TNodeId,
    pub to: TNodeId,
    pub traversal: TraversalKind,
    pub lock: Option<TemplateLock>,
}

/// Key declared by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateKey {
    pub name: String,
    pub key_type: KeyType,
    /// Author intent: every instance of the template shares this key. Only
    /// honoured under [`KeyPolicy::AuthorMarked`](crate::key::KeyPolicy).
    pub shared: bool,
}

/// A seam: an arc edge that a nested sub-cycle may later replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSeam {
    pub id: TInsertionId,
    pub edge: TEdgeId,
}

/// An immutable cycle blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleTemplate {
    name: String,
    cycle_type: CycleType,
    nodes: IndexMap<TNodeId, TemplateNode>,
    edges: IndexMap<TEdgeId, TemplateEdge>,
    keys: IndexMap<TKeyRef, TemplateKey>,
    start: TNodeId,
    goal: TNodeId,
    arc_a: Vec<TEdgeId>,
    arc_b: Vec<TEdgeId>,
    seams: Vec<TemplateSeam>,
}

impl CycleTemplate {
    /// Assembles a template from raw parts without validating it.
    ///
    /// Intended for loaders that validate separately. Instantiating an
    /// unvalidated template still fails on dangling seam references.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        name: String,
        cycle_type: CycleType,
        nodes: IndexMap<TNodeId, TemplateNode>,
        edges: IndexMap<TEdgeId, TemplateEdge>,
        keys: IndexMap<TKeyRef, TemplateKey>,
        start: TNodeId,
        goal: TNodeId,
        arcs: (Vec<TEdgeId>, Vec<TEdgeId>),
        seams: Vec<TemplateSeam>,
    ) -> Self {
        CycleTemplate {
            name,
            cycle_type,
            nodes,
            edges,
            keys,
            start,
            goal,
            arc_a: arcs.0,
            arc_b: arcs.1,
            seams,
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cycle_type(&self) -> CycleType {
        self.cycle_type
    }

    pub fn nodes(&self) -> &IndexMap<TNodeId, TemplateNode> {
        &self.nodes
    }

    pub fn edges(&self) -> &IndexMap<TEdgeId, TemplateEdge> {
        &self.edges
    }

    pub fn keys(&self) -> &IndexMap<TKeyRef, TemplateKey> {
        &self.keys
    }

    pub fn start(&self) -> TNodeId {
        self.start
    }

    pub fn goal(&self) -> TNodeId {
        self.goal
    }

    pub fn arc(&self, arc: CycleArc) -> &[TEdgeId] {
        match arc {
            CycleArc::A => &self.arc_a,
            CycleArc::B => &self.arc_b,
        }
    }

    pub fn seams(&self) -> &[TemplateSeam] {
        &self.seams
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Which arc `edge` lies on, if any.
    pub fn arc_of(&self, edge: TEdgeId) -> Option<CycleArc> {
        if self.arc_a.contains(&edge) {
            Some(CycleArc::A)
        } else if self.arc_b.contains(&edge) {
            Some(CycleArc::B)
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Checks every structural invariant of the template.
    ///
    /// - Start and Goal exist, differ, and are the only nodes of their kind.
    /// - Every edge joins two existing, distinct nodes.
    /// - Each arc is a non-empty contiguous chain from Start to Goal; arcs
    ///   share no edge.
    /// - Every seam references an existing edge, at most once per edge.
    /// - Key grants and locks reference declared keys; tags hold no grants.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.check_node(self.start)?;
        self.check_node(self.goal)?;
        if self.start == self.goal {
            return Err(self.invalid("start and goal are the same node"));
        }
        for (&id, node) in &self.nodes {
            let expected = if id == self.start {
                TemplateNodeKind::Start
            } else if id == self.goal {
                TemplateNodeKind::Goal
            } else {
                TemplateNodeKind::Normal
            };
            if node.kind != expected {
                return Err(self.invalid(format!(
                    "node {id} has kind {:?}, expected {expected:?}",
                    node.kind
                )));
            }
            if node.tags.iter().any(|t| t.granted_key().is_some()) {
                return Err(self.invalid(format!(
                    "node {id} carries a key-grant tag; use a template key grant"
                )));
            }
            if let Some(key) = node.grants {
                self.check_key(key)?;
            }
        }

        for (&id, edge) in &self.edges {
            self.check_node(edge.from)?;
            self.check_node(edge.to)?;
            if edge.from == edge.to {
                return Err(self.invalid(format!("edge {id} is a self-loop")));
            }
            if let Some(lock) = edge.lock {
                self.check_key(lock.key)?;
            }
        }

        let mut on_arc = HashSet::new();
        for arc in [CycleArc::A, CycleArc::B] {
            self.check_arc(arc)?;
            for &edge in self.arc(arc) {
                if !on_arc.insert(edge) {
                    return Err(self.invalid(format!("edge {edge} lies on both arcs")));
                }
            }
        }

        self.check_seams()
    }

    /// Checks only that every seam references an existing template edge.
    ///
    /// This is the minimum the rewrite engine needs and is re-run at every
    /// instantiation.
    pub fn check_seams(&self) -> Result<(), CoreError> {
        let mut seen_ids = HashSet::new();
        let mut seen_edges = HashSet::new();
        for seam in &self.seams {
            if !self.edges.contains_key(&seam.edge) {
                return Err(CoreError::UnknownTemplateEdge {
                    template: self.name.clone(),
                    edge: seam.edge,
                });
            }
            if !seen_ids.insert(seam.id) {
                return Err(self.invalid(format!("seam id {} used twice", seam.id)));
            }
            if !seen_edges.insert(seam.edge) {
                return Err(self.invalid(format!("edge {} has two seams", seam.edge)));
            }
        }
        Ok(())
    }

    fn check_arc(&self, arc: CycleArc) -> Result<(), CoreError> {
        let chain = self.arc(arc);
        if chain.is_empty() {
            return Err(self.invalid(format!("arc {arc:?} is empty")));
        }
        let mut at = self.start;
        for &id in chain {
            let edge = self.edges.get(&id).ok_or_else(|| CoreError::UnknownTemplateEdge {
                template: self.name.clone(),
                edge: id,
            })?;
            if edge.from != at {
                return Err(self.invalid(format!(
                    "arc {arc:?} breaks at edge {id}: expected it to leave {at}"
                )));
            }
            at = edge.to;
        }
        if at != self.goal {
            return Err(self.invalid(format!("arc {arc:?} ends at {at}, not the goal")));
        }
        Ok(())
    }

    fn check_node(&self, node: TNodeId) -> Result<(), CoreError> {
        if self.nodes.contains_key(&node) {
            Ok(())
        } else {
            Err(CoreError::UnknownTemplateNode {
                template: self.name.clone(),
                node,
            })
        }
    }

    fn check_key(&self, key: TKeyRef) -> Result<(), CoreError> {
        if self.keys.contains_key(&key) {
            Ok(())
        } else {
            Err(CoreError::UnknownTemplateKey {
                template: self.name.clone(),
                key,
            })
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> CoreError {
        CoreError::InvalidTemplate {
            template: self.name.clone(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Incremental authoring helper for [`CycleTemplate`].
///
/// The Start and Goal nodes are created up front. Arcs are declared as node
/// paths; the builder creates the connecting edges.
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    name: String,
    cycle_type: CycleType,
    nodes: IndexMap<TNodeId, TemplateNode>,
    edges: IndexMap<TEdgeId, TemplateEdge>,
    keys: IndexMap<TKeyRef, TemplateKey>,
    start: TNodeId,
    goal: TNodeId,
    arc_a: Vec<TEdgeId>,
    arc_b: Vec<TEdgeId>,
    seams: Vec<TemplateSeam>,
    next_node: u32,
    next_edge: u32,
    next_key: u32,
    /// First dangling reference passed to an annotating method.
    bad_ref: Option<CoreError>,
}

impl TemplateBuilder {
    /// Starts a template named after its cycle type.
    pub fn new(cycle_type: CycleType) -> Self {
        Self::named(cycle_type.name(), cycle_type)
    }

    pub fn named(name: impl Into<String>, cycle_type: CycleType) -> Self {
        let mut builder = TemplateBuilder {
            name: name.into(),
            cycle_type,
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            keys: IndexMap::new(),
            start: TNodeId(0),
            goal: TNodeId(0),
            arc_a: Vec::new(),
            arc_b: Vec::new(),
            seams: Vec::new(),
            next_node: 0,
            next_edge: 0,
            next_key: 0,
            bad_ref: None,
        };
        builder.start = builder.push_node(TemplateNodeKind::Start, "start", Vec::new());
        builder.goal = builder.push_node(TemplateNodeKind::Goal, "goal", Vec::new());
        builder
    }

    pub fn start(&self) -> TNodeId {
        self.start
    }

    pub fn goal(&self) -> TNodeId {
        self.goal
    }

    /// Adds a normal node.
    pub fn node(&mut self, label: &str) -> TNodeId {
        self.push_node(TemplateNodeKind::Normal, label, Vec::new())
    }

    /// Adds a normal node carrying `tags`.
    pub fn tagged_node(&mut self, label: &str, tags: &[RoomTag]) -> TNodeId {
        self.push_node(TemplateNodeKind::Normal, label, tags.to_vec())
    }

    /// Adds a tag to an existing node (including Start/Goal). Unknown nodes
    /// are reported by [`build`](Self::build).
    pub fn tag(&mut self, node: TNodeId, tag: RoomTag) -> &mut Self {
        if let Some(n) = self.node_mut(node) {
            n.tags.push(tag);
        }
        self
    }

    /// Declares a per-instance key.
    pub fn key(&mut self, name: &str, key_type: KeyType) -> TKeyRef {
        self.push_key(name, key_type, false)
    }

    /// Declares a key the author intends to be shared by every instance.
    pub fn shared_key(&mut self, name: &str, key_type: KeyType) -> TKeyRef {
        self.push_key(name, key_type, true)
    }

    /// Makes `node` grant `key`.
    pub fn grant(&mut self, node: TNodeId, key: TKeyRef) -> &mut Self {
        if let Some(n) = self.node_mut(node) {
            n.grants = Some(key);
        }
        self
    }

    /// Locks `edge` behind `key`.
    pub fn lock(&mut self, edge: TEdgeId, key: TKeyRef, lock_type: LockType) -> &mut Self {
        if let Some(e) = self.edge_mut(edge) {
            e.lock = Some(TemplateLock { key, lock_type });
        }
        self
    }

    /// Sets the traversal kind of an edge.
    pub fn traversal(&mut self, edge: TEdgeId, traversal: TraversalKind) -> &mut Self {
        if let Some(e) = self.edge_mut(edge) {
            e.traversal = traversal;
        }
        self
    }

    /// Adds a free-standing edge that belongs to neither arc.
    pub fn edge(&mut self, from: TNodeId, to: TNodeId) -> TEdgeId {
        let id = TEdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            id,
            TemplateEdge {
                from,
                to,
                traversal: TraversalKind::Normal,
                lock: None,
            },
        );
        id
    }

    /// Declares `arc` as the path through `via` from Start to Goal and returns
    /// the created edges in path order.
    pub fn arc(&mut self, arc: CycleArc, via: &[TNodeId]) -> Vec<TEdgeId> {
        let mut path = Vec::with_capacity(via.len() + 2);
        path.push(self.start);
        path.extend_from_slice(via);
        path.push(self.goal);

        let chain: Vec<TEdgeId> = path.windows(2).map(|w| self.edge(w[0], w[1])).collect();
        match arc {
            CycleArc::A => self.arc_a = chain.clone(),
            CycleArc::B => self.arc_b = chain.clone(),
        }
        chain
    }

    /// Marks `edge` as an insertion seam.
    pub fn seam(&mut self, edge: TEdgeId) -> TInsertionId {
        let id = TInsertionId(self.seams.len() as u32);
        self.seams.push(TemplateSeam { id, edge });
        id
    }

    /// Finishes the template, validating it.
    ///
    /// Fails with the first unknown node or edge handed to [`tag`](Self::tag),
    /// [`grant`](Self::grant), [`lock`](Self::lock) or
    /// [`traversal`](Self::traversal), before any structural check.
    pub fn build(self) -> Result<CycleTemplate, CoreError> {
        if let Some(err) = self.bad_ref {
            return Err(err);
        }
        let template = CycleTemplate {
            name: self.name,
            cycle_type: self.cycle_type,
            nodes: self.nodes,
            edges: self.edges,
            keys: self.keys,
            start: self.start,
            goal: self.goal,
            arc_a: self.arc_a,
            arc_b: self.arc_b,
            seams: self.seams,
        };
        template.validate()?;
        Ok(template)
    }

    fn node_mut(&mut self, node: TNodeId) -> Option<&mut TemplateNode> {
        if !self.nodes.contains_key(&node) {
            self.bad_ref.get_or_insert(CoreError::UnknownTemplateNode {
                template: self.name.clone(),
                node,
            });
        }
        self.nodes.get_mut(&node)
    }

    fn edge_mut(&mut self, edge: TEdgeId) -> Option<&mut TemplateEdge> {
        if !self.edges.contains_key(&edge) {
            self.bad_ref.get_or_insert(CoreError::UnknownTemplateEdge {
                template: self.name.clone(),
                edge,
            });
        }
        self.edges.get_mut(&edge)
    }

    fn push_node(&mut self, kind: TemplateNodeKind, label: &str, tags: Vec<RoomTag>) -> TNodeId {
        let id = TNodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            TemplateNode {
                kind,
                label: Some(label.to_string()),
                tags,
                grants: None,
            },
        );
        id
    }

    fn push_key(&mut self, name: &str, key_type: KeyType, shared: bool) -> TKeyRef {
        let id = TKeyRef(self.next_key);
        self.next_key += 1;
        self.keys.insert(
            id,
            TemplateKey {
                name: name.to_string(),
                key_type,
                shared,
            },
        );
        id
    }
}
