//! The rewrite engine: template instantiation and seam splicing.
//!
//! [`instantiate`] turns an immutable [`CycleTemplate`] into a [`Fragment`]
//! of freshly identified rooms and passages. [`splice_replace_edge`] removes
//! a seam edge from the live graph and wires a fragment in its place.
//!
//! Fragments own their rooms and passages outright. Nothing in a fragment
//! points back into the template, so instantiating the same template twice
//! can never alias.

use std::collections::HashSet;

use indexmap::IndexMap;

use cyclic_core::id::{CycleId, EdgeId, InsertionId, NodeId, TEdgeId, TNodeId};
use cyclic_core::{
    CoreError, CycleArc, CycleTemplate, DungeonGraph, Gate, RoomEdge, RoomKind, RoomNode, RoomTag,
    TemplateNodeKind,
};

use crate::context::GenerationContext;
use crate::error::GenerationError;
use crate::provenance::{CycleInstance, InsertionPoint};

/// Rooms, passages and seams produced by one instantiation.
///
/// Transient: built by [`instantiate`] and consumed by [`add_fragment`] or
/// [`splice_replace_edge`].
#[derive(Debug, Clone)]
pub struct Fragment {
    pub entry: NodeId,
    pub exit: NodeId,
    pub nodes: Vec<RoomNode>,
    pub edges: Vec<RoomEdge>,
    pub insertion_points: Vec<InsertionPoint>,
}

impl Fragment {
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.iter().map(|e| e.id).collect()
    }
}

/// Result of a successful splice.
#[derive(Debug, Clone)]
pub struct SpliceOutcome {
    /// The seam edge as it was when removed.
    pub seam: RoomEdge,
    /// `seam.from -> fragment.entry`
    pub entry_bridge: EdgeId,
    /// `fragment.exit -> seam.to`
    pub exit_bridge: EdgeId,
}

// ---------------------------------------------------------------------------
// Instantiate
// ---------------------------------------------------------------------------

/// Instantiates `template` at nesting `depth`.
///
/// `parent` is the (cycle, insertion) pair being expanded, `None` for the
/// root. Every room and passage gets a fresh ID from `ctx`; rooms are all
/// allocated before any passage. Template key grants and locks resolve to
/// global keys through the context's key policy, so a lock and the grant it
/// refers to inside one fragment carry the same [`KeyId`](cyclic_core::id::KeyId).
///
/// A seam pointing at an edge the template does not define is a
/// [`GenerationError::MalformedTemplate`]; nothing is allocated in that case.
pub fn instantiate(
    template: &CycleTemplate,
    depth: u32,
    parent: Option<(CycleId, InsertionId)>,
    ctx: &mut GenerationContext,
) -> Result<(Fragment, CycleInstance), GenerationError> {
    template.check_seams().map_err(|err| match err {
        CoreError::UnknownTemplateEdge { template, edge } => {
            GenerationError::MalformedTemplate { template, edge }
        }
        other => GenerationError::Core(other),
    })?;

    let cycle = ctx.ids.new_cycle();

    // ---- rooms ----
    let mut node_map: IndexMap<TNodeId, NodeId> = IndexMap::with_capacity(template.node_count());
    let mut nodes = Vec::with_capacity(template.node_count());
    for (&tnode, blueprint) in template.nodes() {
        let id = ctx.ids.new_node();
        node_map.insert(tnode, id);

        let mut room = RoomNode::new(id);
        room.label = blueprint.label.clone();
        for tag in &blueprint.tags {
            room.add_tag(tag.clone());
        }
        match blueprint.kind {
            TemplateNodeKind::Start => {
                room.add_tag(RoomTag::CycleStart);
                if depth == 0 {
                    room.kind = RoomKind::Entrance;
                }
            }
            TemplateNodeKind::Goal => {
                room.add_tag(RoomTag::CycleGoal);
                if depth == 0 {
                    room.kind = RoomKind::Exit;
                }
            }
            TemplateNodeKind::Normal => {}
        }
        if let Some(key) = blueprint.grants {
            let global = ctx.resolve_template_key(template, key, cycle)?;
            room.add_tag(RoomTag::KeyGrant(global));
        }
        nodes.push(room);
    }

    let map_node = |tnode: TNodeId| {
        node_map
            .get(&tnode)
            .copied()
            .ok_or_else(|| CoreError::UnknownTemplateNode {
                template: template.name().to_string(),
                node: tnode,
            })
    };

    // ---- passages ----
    let mut edge_map: IndexMap<TEdgeId, EdgeId> = IndexMap::with_capacity(template.edge_count());
    let mut edges = Vec::with_capacity(template.edge_count());
    for (&tedge, blueprint) in template.edges() {
        let id = ctx.ids.new_edge();
        edge_map.insert(tedge, id);

        let mut edge = RoomEdge::new(id, map_node(blueprint.from)?, map_node(blueprint.to)?)
            .with_traversal(blueprint.traversal);
        if let Some(lock) = blueprint.lock {
            let key = ctx.resolve_template_key(template, lock.key, cycle)?;
            edge.gate = Some(Gate::single(ctx.ids.new_gate(), key, lock.lock_type));
        }
        edges.push(edge);
    }

    let map_edge = |tedge: TEdgeId| -> Result<EdgeId, GenerationError> {
        edge_map
            .get(&tedge)
            .copied()
            .ok_or_else(|| GenerationError::MalformedTemplate {
                template: template.name().to_string(),
                edge: tedge,
            })
    };
    let arc_a = template
        .arc(CycleArc::A)
        .iter()
        .map(|&e| map_edge(e))
        .collect::<Result<Vec<_>, _>>()?;
    let arc_b = template
        .arc(CycleArc::B)
        .iter()
        .map(|&e| map_edge(e))
        .collect::<Result<Vec<_>, _>>()?;
    let arc_rooms = |arc: CycleArc| -> Result<Vec<NodeId>, GenerationError> {
        let mut rooms = Vec::new();
        for tedge in template.arc(arc) {
            let blueprint =
                template
                    .edges()
                    .get(tedge)
                    .ok_or_else(|| GenerationError::MalformedTemplate {
                        template: template.name().to_string(),
                        edge: *tedge,
                    })?;
            if blueprint.to != template.goal() && blueprint.to != template.start() {
                rooms.push(map_node(blueprint.to)?);
            }
        }
        Ok(rooms)
    };
    let arc_a_rooms = arc_rooms(CycleArc::A)?;
    let arc_b_rooms = arc_rooms(CycleArc::B)?;

    // ---- seams ----
    let mut insertion_points = Vec::with_capacity(template.seams().len());
    for seam in template.seams() {
        insertion_points.push(InsertionPoint {
            id: ctx.ids.new_insertion(),
            cycle,
            seam_edge: map_edge(seam.edge)?,
            depth,
        });
    }

    let entry = map_node(template.start())?;
    let exit = map_node(template.goal())?;

    let instance = CycleInstance {
        id: cycle,
        cycle_type: template.cycle_type(),
        depth,
        entry,
        exit,
        arc_a,
        arc_b,
        arc_a_rooms,
        arc_b_rooms,
        insertion_points: insertion_points.clone(),
        parent_cycle: parent.map(|(c, _)| c),
        parent_insertion: parent.map(|(_, i)| i),
    };
    let fragment = Fragment {
        entry,
        exit,
        nodes,
        edges,
        insertion_points,
    };
    Ok((fragment, instance))
}

// ---------------------------------------------------------------------------
// Splice
// ---------------------------------------------------------------------------

/// Adds a fragment to the graph as-is (used for the root cycle).
pub fn add_fragment(graph: &mut DungeonGraph, fragment: Fragment) -> Result<(), GenerationError> {
    check_fragment(graph, &fragment)?;
    for node in fragment.nodes {
        graph.add_node(node)?;
    }
    for edge in fragment.edges {
        graph.add_edge(edge)?;
    }
    Ok(())
}

/// Replaces seam edge `seam` (`a -> b`) with `fragment`, wired in by two new
/// bridging edges `a -> fragment.entry` and `fragment.exit -> b`.
///
/// The entry bridge inherits the seam's traversal kind and gate, so whatever
/// restricted passage through the seam still restricts passage into the
/// sub-cycle. The exit bridge is a plain passage.
///
/// Fails without touching the graph if the seam is missing, a fragment ID is
/// already present, or a fragment edge is a self-loop or ends outside both
/// the fragment and the graph.
pub fn splice_replace_edge(
    graph: &mut DungeonGraph,
    seam: EdgeId,
    fragment: Fragment,
    ctx: &mut GenerationContext,
) -> Result<SpliceOutcome, GenerationError> {
    if !graph.contains_edge(seam) {
        return Err(CoreError::EdgeNotFound { id: seam }.into());
    }
    check_fragment(graph, &fragment)?;

    let removed = graph.remove_edge(seam)?;
    let (entry, exit) = (fragment.entry, fragment.exit);
    for node in fragment.nodes {
        graph.add_node(node)?;
    }
    for edge in fragment.edges {
        graph.add_edge(edge)?;
    }

    let mut entry_bridge =
        RoomEdge::new(ctx.ids.new_edge(), removed.from, entry).with_traversal(removed.traversal);
    entry_bridge.gate = removed.gate.clone();
    let entry_bridge = graph.add_edge(entry_bridge)?;
    let exit_bridge = graph.add_edge(RoomEdge::new(ctx.ids.new_edge(), exit, removed.to))?;

    Ok(SpliceOutcome {
        seam: removed,
        entry_bridge,
        exit_bridge,
    })
}

/// Everything [`DungeonGraph::add_node`] and [`DungeonGraph::add_edge`] would
/// reject, checked up front so a failing splice leaves the graph as it was.
fn check_fragment(graph: &DungeonGraph, fragment: &Fragment) -> Result<(), CoreError> {
    let mut own_nodes = HashSet::with_capacity(fragment.nodes.len());
    for node in &fragment.nodes {
        if graph.contains_node(node.id) || !own_nodes.insert(node.id) {
            return Err(CoreError::DuplicateNode { id: node.id });
        }
    }
    let mut own_edges = HashSet::with_capacity(fragment.edges.len());
    for edge in &fragment.edges {
        if graph.contains_edge(edge.id) || !own_edges.insert(edge.id) {
            return Err(CoreError::DuplicateEdge { id: edge.id });
        }
        if edge.from == edge.to {
            return Err(CoreError::SelfLoop {
                edge: edge.id,
                node: edge.from,
            });
        }
        for end in [edge.from, edge.to] {
            if !own_nodes.contains(&end) && !graph.contains_node(end) {
                return Err(CoreError::NodeNotFound { id: end });
            }
        }
    }
    Ok(())
}
