//! The generator: drives one generation run from root to finished graph.
//!
//! A run always starts the same way (select the root type, instantiate it at
//! depth 0, fire the root rule hook) and always ends the same way (fire every
//! rule's finishing hook, filter dangling passages, prune provenance). What
//! happens in between is chosen by the settings' [`Budget`]:
//!
//! - [`Budget::SeamSplice`] runs [`breadth`]: a FIFO work-list of insertion
//!   points, expanded breadth-first under a depth limit and a total
//!   insertion budget.
//! - [`Budget::TreeRewrite`] runs [`tree`]: depth-first recursive rewriting
//!   under a node budget, a per-cycle rewrite limit, and a rewrite
//!   probability.
//!
//! All mutable state (allocator, key registry, RNG, rule state) is created
//! per run and dropped with it, so a [`Generator`] can be reused and shared.

mod breadth;
mod tree;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use cyclic_core::id::NodeId;
use cyclic_core::{
    CycleTemplate, CycleType, DungeonGraph, GraphSnapshot, KeyIdentity, KeyRegistry,
    TemplateLibrary,
};

use crate::context::GenerationContext;
use crate::error::GenerationError;
use crate::provenance::{CycleInstance, InsertionPoint, InsertionRecord, Provenance, PruneReason};
use crate::rewrite::{add_fragment, instantiate, splice_replace_edge};
use crate::rules::{RuleContext, RuleRegistry};
use crate::selector::CycleSelector;
use crate::settings::{Budget, GenerationSettings};

/// Generates dungeons from a template library and a rule registry.
#[derive(Debug, Clone)]
pub struct Generator<'l> {
    library: &'l TemplateLibrary,
    rules: RuleRegistry,
}

impl<'l> Generator<'l> {
    /// A generator with no rules: pure structural rewriting.
    pub fn new(library: &'l TemplateLibrary) -> Self {
        Generator {
            library,
            rules: RuleRegistry::new(),
        }
    }

    pub fn with_rules(mut self, rules: RuleRegistry) -> Self {
        self.rules = rules;
        self
    }

    pub fn library(&self) -> &TemplateLibrary {
        self.library
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// Runs one generation.
    ///
    /// Returns a complete, internally consistent dungeon or an error; a
    /// partial graph is never returned.
    pub fn generate(
        &self,
        settings: &GenerationSettings,
        selector: &mut dyn CycleSelector,
    ) -> Result<GeneratedDungeon, GenerationError> {
        if let Err(err) = settings.validate() {
            error!(%err, "generation settings rejected");
            return Err(err);
        }
        info!(
            seed = settings.seed,
            max_depth = settings.max_depth,
            strategy = settings.strategy_name(),
            "generation started"
        );

        let mut run = Run::new(self.library, settings, self.rules.clone());
        let root = run.start_root(selector)?;
        match settings.budget {
            Budget::SeamSplice {
                max_insertions_total,
            } => breadth::expand(&mut run, selector, &root, max_insertions_total)?,
            Budget::TreeRewrite {
                max_nodes,
                max_rewrites_per_cycle,
                rewrite_probability,
            } => {
                let limits = tree::TreeLimits {
                    max_nodes,
                    max_rewrites_per_cycle,
                    rewrite_probability,
                };
                tree::expand(&mut run, selector, &root, &limits)?
            }
        }
        let dungeon = run.finish()?;

        info!(
            nodes = dungeon.graph.node_count(),
            edges = dungeon.graph.edge_count(),
            cycles = dungeon.provenance.cycle_count(),
            expanded = dungeon.provenance.expanded_count(),
            pruned = dungeon.provenance.pruned_count(),
            "generation finished"
        );
        Ok(dungeon)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A finished generation run.
#[derive(Debug, Clone)]
pub struct GeneratedDungeon {
    pub graph: DungeonGraph,
    pub provenance: Provenance,
    pub keys: KeyRegistry,
    pub settings: GenerationSettings,
}

impl GeneratedDungeon {
    /// The root cycle. Always present on a successful run.
    pub fn root(&self) -> Option<&CycleInstance> {
        self.provenance.root()
    }

    /// Rooms granting at least one key.
    pub fn key_rooms(&self) -> Vec<NodeId> {
        self.graph
            .nodes()
            .filter(|n| n.granted_keys().next().is_some())
            .map(|n| n.id)
            .collect()
    }

    pub fn summary(&self) -> DungeonSummary {
        DungeonSummary {
            rooms: self.graph.node_count(),
            passages: self.graph.edge_count(),
            cycles: self.provenance.cycle_count(),
            expanded: self.provenance.expanded_count(),
            pruned: self.provenance.pruned_count(),
            max_depth_reached: self.provenance.max_depth_reached(),
            keys: self.keys.len(),
            gated_passages: self.graph.edges().filter(|e| e.is_gated()).count(),
        }
    }

    /// Everything a presentation layer needs, in serializable form.
    pub fn report(&self) -> DungeonReport {
        DungeonReport {
            settings: self.settings.clone(),
            summary: self.summary(),
            graph: self.graph.snapshot(),
            provenance: self.provenance.clone(),
            keys: self.keys.identities().cloned().collect(),
        }
    }
}

/// Headline counts of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonSummary {
    pub rooms: usize,
    pub passages: usize,
    pub cycles: usize,
    pub expanded: usize,
    pub pruned: usize,
    pub max_depth_reached: u32,
    pub keys: usize,
    pub gated_passages: usize,
}

/// Serializable view of a [`GeneratedDungeon`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonReport {
    pub settings: GenerationSettings,
    pub summary: DungeonSummary,
    pub graph: GraphSnapshot,
    pub provenance: Provenance,
    pub keys: Vec<KeyIdentity>,
}

impl DungeonReport {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Mutable state of one run, shared by both strategies.
pub(crate) struct Run<'g> {
    library: &'g TemplateLibrary,
    settings: &'g GenerationSettings,
    rules: RuleRegistry,
    rng: ChaCha8Rng,
    ctx: GenerationContext,
    graph: DungeonGraph,
    provenance: Provenance,
}

impl<'g> Run<'g> {
    fn new(
        library: &'g TemplateLibrary,
        settings: &'g GenerationSettings,
        rules: RuleRegistry,
    ) -> Self {
        Run {
            library,
            settings,
            rules,
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            ctx: GenerationContext::new(settings.key_policy),
            graph: DungeonGraph::new(),
            provenance: Provenance::new(),
        }
    }

    /// Selects, instantiates and registers the root cycle, then fires the
    /// root rule hook.
    fn start_root(
        &mut self,
        selector: &mut dyn CycleSelector,
    ) -> Result<CycleInstance, GenerationError> {
        let cycle_type = selector.select_root(&mut self.rng);
        let library = self.library;
        let template = library
            .get(cycle_type)
            .ok_or(GenerationError::MissingRootTemplate { cycle_type })?;

        if let Budget::TreeRewrite { max_nodes, .. } = self.settings.budget {
            if template.node_count() > max_nodes {
                let err = GenerationError::InvalidSettings {
                    reason: format!(
                        "max_nodes {max_nodes} cannot hold the {} root template ({} rooms)",
                        template.name(),
                        template.node_count()
                    ),
                };
                error!(%err, "generation settings rejected");
                return Err(err);
            }
        }

        let (fragment, root) = instantiate(template, 0, None, &mut self.ctx)?;
        let (nodes, edges) = (fragment.node_ids(), fragment.edge_ids());
        add_fragment(&mut self.graph, fragment)?;
        self.provenance.register_cycle(root.clone(), &nodes, &edges);
        debug!(
            cycle = %root.id,
            %cycle_type,
            seams = root.insertion_points.len(),
            "root instantiated"
        );

        self.rules.root_instantiated(
            &mut RuleContext {
                graph: &mut self.graph,
                ctx: &mut self.ctx,
                rng: &mut self.rng,
                provenance: &self.provenance,
            },
            &root,
        )?;
        Ok(root)
    }

    fn max_depth(&self) -> u32 {
        self.settings.max_depth
    }

    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn schedule(&mut self, point: &InsertionPoint) {
        self.provenance.mark_pending(point.id);
    }

    fn prune(&mut self, point: &InsertionPoint, reason: PruneReason) {
        debug!(insertion = %point.id, depth = point.depth, ?reason, "insertion pruned");
        self.provenance.mark_pruned(point.id, reason);
    }

    /// Looks up the template for a selected sub-cycle type. A missing
    /// template prunes the insertion point rather than failing the run.
    fn subcycle_template(
        &mut self,
        point: &InsertionPoint,
        cycle_type: CycleType,
    ) -> Option<&'g CycleTemplate> {
        let library = self.library;
        let template = library.get(cycle_type);
        if template.is_none() {
            warn!(
                insertion = %point.id,
                %cycle_type,
                "no template for sub-cycle, seam left unexpanded"
            );
            self.prune(point, PruneReason::MissingTemplate);
        }
        template
    }

    /// Expands `point` with `template`: instantiate one level deeper, splice
    /// in place of the seam, record provenance, fire the parent's rule hook.
    fn expand(
        &mut self,
        point: &InsertionPoint,
        template: &CycleTemplate,
    ) -> Result<CycleInstance, GenerationError> {
        let seam = self
            .graph
            .edge(point.seam_edge)
            .ok_or(GenerationError::MissingSeamEdge {
                insertion: point.id,
                edge: point.seam_edge,
            })?;
        let (seam_from, seam_to) = (seam.from, seam.to);

        let depth = point.depth + 1;
        let (fragment, child) =
            instantiate(template, depth, Some((point.cycle, point.id)), &mut self.ctx)?;
        let (nodes, edges) = (fragment.node_ids(), fragment.edge_ids());
        let outcome =
            splice_replace_edge(&mut self.graph, point.seam_edge, fragment, &mut self.ctx)?;

        self.provenance.register_cycle(child.clone(), &nodes, &edges);
        self.provenance.record_splice(InsertionRecord {
            insertion: point.id,
            parent_cycle: point.cycle,
            child_cycle: child.id,
            child_type: child.cycle_type,
            depth,
            seam_edge: point.seam_edge,
            seam_from,
            seam_to,
            entry_bridge: outcome.entry_bridge,
            exit_bridge: outcome.exit_bridge,
        });
        debug!(
            insertion = %point.id,
            parent = %point.cycle,
            child = %child.id,
            cycle_type = %child.cycle_type,
            depth,
            "sub-cycle spliced"
        );

        if let Some(parent_type) = self.provenance.cycle(point.cycle).map(|c| c.cycle_type) {
            self.rules.subcycle_inserted(
                &mut RuleContext {
                    graph: &mut self.graph,
                    ctx: &mut self.ctx,
                    rng: &mut self.rng,
                    provenance: &self.provenance,
                },
                parent_type,
                point,
                &child,
            )?;
        }
        Ok(child)
    }

    /// Fires the finishing hooks and assembles the result, filtering any
    /// dangling passages first.
    fn finish(mut self) -> Result<GeneratedDungeon, GenerationError> {
        self.rules.generation_finished(&mut RuleContext {
            graph: &mut self.graph,
            ctx: &mut self.ctx,
            rng: &mut self.rng,
            provenance: &self.provenance,
        })?;

        let dropped = self.graph.remove_dangling_edges();
        if !dropped.is_empty() {
            warn!(count = dropped.len(), "dangling passages removed from result");
        }
        self.provenance.retain_existing(&self.graph);

        Ok(GeneratedDungeon {
            graph: self.graph,
            provenance: self.provenance,
            keys: self.ctx.keys,
            settings: self.settings.clone(),
        })
    }
}
