//! Cycle selector policies.
//!
//! A [`CycleSelector`] decides which cycle type to instantiate for the root
//! and for every sub-cycle. Selectors draw only from the run's seeded
//! `ChaCha8Rng`, so the same seed yields the same choices.

use std::collections::VecDeque;

use cyclic_core::{CycleType, TemplateLibrary};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Chooses cycle types during generation.
pub trait CycleSelector {
    /// Chooses the root cycle type.
    fn select_root(&mut self, rng: &mut ChaCha8Rng) -> CycleType;

    /// Chooses the type of a sub-cycle that will sit at nesting `depth`.
    fn select_subcycle(&mut self, rng: &mut ChaCha8Rng, depth: u32) -> CycleType;
}

/// Always returns the same root and sub-cycle types.
#[derive(Debug, Clone, Copy)]
pub struct FixedSelector {
    pub root: CycleType,
    pub subcycle: CycleType,
}

impl FixedSelector {
    pub fn new(root: CycleType, subcycle: CycleType) -> Self {
        FixedSelector { root, subcycle }
    }
}

impl CycleSelector for FixedSelector {
    fn select_root(&mut self, _rng: &mut ChaCha8Rng) -> CycleType {
        self.root
    }

    fn select_subcycle(&mut self, _rng: &mut ChaCha8Rng, _depth: u32) -> CycleType {
        self.subcycle
    }
}

/// Picks uniformly from a list of types.
///
/// The root can be pinned; sub-cycles are always drawn from the list.
#[derive(Debug, Clone)]
pub struct UniformSelector {
    root: Option<CycleType>,
    choices: Vec<CycleType>,
}

impl UniformSelector {
    /// Draws every choice from `choices`. An empty list falls back to
    /// [`CycleType::TwoAlternativePaths`].
    pub fn new(choices: Vec<CycleType>) -> Self {
        UniformSelector {
            root: None,
            choices,
        }
    }

    /// Draws from every type registered in `library`.
    pub fn from_library(library: &TemplateLibrary) -> Self {
        Self::new(library.cycle_types())
    }

    /// Pins the root type; sub-cycles stay uniform.
    pub fn with_root(mut self, root: CycleType) -> Self {
        self.root = Some(root);
        self
    }

    fn draw(&self, rng: &mut ChaCha8Rng) -> CycleType {
        if self.choices.is_empty() {
            return CycleType::TwoAlternativePaths;
        }
        self.choices[rng.gen_range(0..self.choices.len())]
    }
}

impl CycleSelector for UniformSelector {
    fn select_root(&mut self, rng: &mut ChaCha8Rng) -> CycleType {
        match self.root {
            Some(root) => root,
            None => self.draw(rng),
        }
    }

    fn select_subcycle(&mut self, rng: &mut ChaCha8Rng, _depth: u32) -> CycleType {
        self.draw(rng)
    }
}

/// Replays a scripted sequence of sub-cycle types, then falls back to a fixed
/// type once the script runs out.
#[derive(Debug, Clone)]
pub struct ScriptedSelector {
    root: CycleType,
    script: VecDeque<CycleType>,
    fallback: CycleType,
}

impl ScriptedSelector {
    pub fn new(root: CycleType, script: Vec<CycleType>, fallback: CycleType) -> Self {
        ScriptedSelector {
            root,
            script: script.into(),
            fallback,
        }
    }
}

impl CycleSelector for ScriptedSelector {
    fn select_root(&mut self, _rng: &mut ChaCha8Rng) -> CycleType {
        self.root
    }

    fn select_subcycle(&mut self, _rng: &mut ChaCha8Rng, _depth: u32) -> CycleType {
        self.script.pop_front().unwrap_or(self.fallback)
    }
}
