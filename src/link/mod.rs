/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Multinode links: declarations, validation and pool registration.
//!
//! A [`Link`] couples values taken at two or more (phase, node) pairs into
//! one residual. Links with a zero weight become hard constraints bounded by
//! a [`BoundInterval`]; any other weight turns them into quadratic objective
//! terms evaluated at those nodes.

mod collection;
mod functions;

pub use collection::LinkCollection;
pub use functions::{prepare_controller_cx, CustomLinkFn, ExtraParams, LinkFunction};

use constraint_solver::Exp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

use crate::controller::{ControllerView, PenaltyController};
use crate::mapping::PhaseMapping;
use crate::node::Node;
use crate::program::{LinkedNode, Penalty, PoolEntry, PoolKind, PoolOwner, Program};
use crate::LinkError;

/// Interval a constraint residual must stay in. Defaults to `[0, 0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundInterval {
    pub min: f64,
    pub max: f64,
}

impl BoundInterval {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Exact equality, `[0, 0]`.
    pub fn equality() -> Self {
        Self::default()
    }
}

/// Whether a link is enforced or penalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkMode {
    Constraint,
    WeightedObjective { weight: f64 },
}

impl LinkMode {
    /// Zero weight means a hard constraint.
    pub fn from_weight(weight: f64) -> Self {
        if weight == 0.0 {
            LinkMode::Constraint
        } else {
            LinkMode::WeightedObjective { weight }
        }
    }

    pub fn pool_kind(&self) -> PoolKind {
        match self {
            LinkMode::Constraint => PoolKind::Constraint,
            LinkMode::WeightedObjective { .. } => PoolKind::Objective,
        }
    }
}

/// Path a prepared link is realized through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealizationPath {
    /// Constraint pool, bounded by the link interval.
    Constraint,
    /// Objective pool, evaluated at the linked nodes only.
    Mayer,
}

/// What a link computes, before it is tagged.
///
/// Bare callables are wrapped into [`LinkFunction::Custom`]. Functions of
/// another penalty category are wrapped the same way unless
/// [`LinkOptions::preserve_tag`] is set, in which case they keep their name.
#[derive(Clone)]
pub enum LinkSpec {
    Function(LinkFunction),
    Callable(CustomLinkFn),
    Foreign { name: String, function: CustomLinkFn },
}

impl LinkSpec {
    /// Wraps a user residual function.
    pub fn callable<F>(function: F) -> Self
    where
        F: Fn(&Link, &[&dyn ControllerView], &ExtraParams) -> Result<Vec<Exp>, LinkError> + 'static,
    {
        LinkSpec::Callable(Rc::new(function))
    }

    /// Wraps a tagged function of another penalty category.
    pub fn foreign<F>(name: &str, function: F) -> Self
    where
        F: Fn(&Link, &[&dyn ControllerView], &ExtraParams) -> Result<Vec<Exp>, LinkError> + 'static,
    {
        LinkSpec::Foreign {
            name: name.to_string(),
            function: Rc::new(function),
        }
    }

    fn into_function(self, preserve_tag: bool) -> LinkFunction {
        match self {
            LinkSpec::Function(function) => function,
            LinkSpec::Callable(function) => LinkFunction::Custom(function),
            LinkSpec::Foreign { name, function } if preserve_tag => {
                LinkFunction::Tagged { name, function }
            }
            LinkSpec::Foreign { function, .. } => LinkFunction::Custom(function),
        }
    }
}

impl From<LinkFunction> for LinkSpec {
    fn from(function: LinkFunction) -> Self {
        LinkSpec::Function(function)
    }
}

impl fmt::Debug for LinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkSpec::Function(function) => write!(f, "Function({function:?})"),
            LinkSpec::Callable(_) => write!(f, "Callable(..)"),
            LinkSpec::Foreign { name, .. } => write!(f, "Foreign({name})"),
        }
    }
}

/// Construction options of a [`Link`].
#[derive(Debug, Clone)]
pub struct LinkOptions {
    nodes: Vec<Node>,
    nodes_phase: Vec<i64>,
    bounds: BoundInterval,
    weight: f64,
    quadratic: bool,
    states_mapping: PhaseMapping,
    variable_key: String,
    extra_params: ExtraParams,
    preserve_tag: bool,
}

impl LinkOptions {
    /// Links `nodes[i]` of phase `nodes_phase[i]`, as an equality constraint.
    pub fn new(
        nodes: impl IntoIterator<Item = Node>,
        nodes_phase: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            nodes_phase: nodes_phase.into_iter().collect(),
            bounds: BoundInterval::equality(),
            weight: 0.0,
            quadratic: true,
            states_mapping: PhaseMapping::identity(),
            variable_key: crate::controller::ALL_VARIABLES.to_string(),
            extra_params: ExtraParams::new(),
            preserve_tag: false,
        }
    }

    /// Constraint interval (ignored in objective mode).
    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = BoundInterval::new(min, max);
        self
    }

    /// Non-zero weights make the link an objective term.
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Whether objective residuals are squared (default `true`).
    pub fn quadratic(mut self, quadratic: bool) -> Self {
        self.quadratic = quadratic;
        self
    }

    pub fn states_mapping(mut self, mapping: PhaseMapping) -> Self {
        self.states_mapping = mapping;
        self
    }

    /// Variable block compared by state/control equality (default `"all"`).
    pub fn key(mut self, key: &str) -> Self {
        self.variable_key = key.to_string();
        self
    }

    /// Named scalar forwarded to custom functions.
    pub fn extra_param(mut self, name: &str, value: f64) -> Self {
        self.extra_params.insert(name.to_string(), value);
        self
    }

    /// Keep a foreign function under its own tag instead of wrapping it as custom.
    pub fn preserve_tag(mut self, preserve: bool) -> Self {
        self.preserve_tag = preserve;
        self
    }
}

/// One declared multinode coupling.
#[derive(Debug, Clone)]
pub struct Link {
    nodes: Vec<Node>,
    nodes_phase: Vec<i64>,
    bounds: BoundInterval,
    mode: LinkMode,
    quadratic: bool,
    function: LinkFunction,
    states_mapping: PhaseMapping,
    variable_key: String,
    extra_params: ExtraParams,
    pool_slot: Option<usize>,
    path: Option<RealizationPath>,
}

impl Link {
    /// Validates and builds a link.
    ///
    /// # Errors
    ///
    /// - [`LinkError::InvalidNodeSpecifier`] for group selectors or negative indices.
    /// - [`LinkError::ArityMismatch`] when `nodes` and `nodes_phase` differ in length.
    /// - [`LinkError::TooFewNodes`] for fewer than two nodes.
    pub fn new(spec: impl Into<LinkSpec>, options: LinkOptions) -> Result<Self, LinkError> {
        let LinkOptions {
            nodes,
            nodes_phase,
            bounds,
            weight,
            quadratic,
            states_mapping,
            variable_key,
            extra_params,
            preserve_tag,
        } = options;

        if let Some((position, node)) = nodes
            .iter()
            .enumerate()
            .find(|(_, node)| !node.is_linkable())
        {
            return Err(LinkError::InvalidNodeSpecifier {
                position,
                node: *node,
            });
        }
        if nodes.len() != nodes_phase.len() {
            return Err(LinkError::ArityMismatch {
                nodes: nodes.len(),
                phases: nodes_phase.len(),
            });
        }
        if nodes.len() < 2 {
            return Err(LinkError::TooFewNodes { count: nodes.len() });
        }

        Ok(Self {
            nodes,
            nodes_phase,
            bounds,
            mode: LinkMode::from_weight(weight),
            quadratic,
            function: spec.into().into_function(preserve_tag),
            states_mapping,
            variable_key,
            extra_params,
            pool_slot: None,
            path: None,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_phase(&self) -> &[i64] {
        &self.nodes_phase
    }

    pub fn bounds(&self) -> BoundInterval {
        self.bounds
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    pub fn quadratic(&self) -> bool {
        self.quadratic
    }

    pub fn function(&self) -> &LinkFunction {
        &self.function
    }

    pub fn states_mapping(&self) -> &PhaseMapping {
        &self.states_mapping
    }

    pub fn variable_key(&self) -> &str {
        &self.variable_key
    }

    pub fn extra_params(&self) -> &ExtraParams {
        &self.extra_params
    }

    /// Slot index in the owning pool, `None` until allocated.
    pub fn pool_slot(&self) -> Option<usize> {
        self.pool_slot
    }

    /// Realization path decided by [`LinkCollection::prepare`].
    pub fn path(&self) -> Option<RealizationPath> {
        self.path
    }

    pub(crate) fn set_path(&mut self, path: RealizationPath) {
        self.path = Some(path);
    }

    pub(crate) fn clear_pool_slot(&mut self) -> Option<usize> {
        self.pool_slot.take()
    }

    /// Phase indices checked against `n_phases`.
    pub fn phase_indices(&self, n_phases: usize) -> Result<Vec<usize>, LinkError> {
        self.nodes_phase
            .iter()
            .map(|&phase| match usize::try_from(phase) {
                Ok(idx) if idx < n_phases => Ok(idx),
                _ => Err(LinkError::InvalidPhaseIndex { phase, n_phases }),
            })
            .collect()
    }

    /// Whether every node lives in the same phase.
    pub fn is_local(&self) -> bool {
        self.nodes_phase.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// Pool this link is stored in.
    pub fn pool_location(&self) -> (PoolOwner, PoolKind) {
        let owner = match self.nodes_phase.first() {
            Some(&phase) if self.is_local() => match usize::try_from(phase) {
                Ok(idx) => PoolOwner::Phase(idx),
                Err(_) => PoolOwner::Program,
            },
            _ => PoolOwner::Program,
        };
        (owner, self.mode.pool_kind())
    }

    /// Reserves this link's slot, reusing the previous one when it has one.
    ///
    /// A reused slot is cleared, ready for re-realization.
    pub fn ensure_pool_slot(&mut self, program: &mut Program) -> Result<usize, LinkError> {
        let (owner, kind) = self.pool_location();
        let slot = program.pool_mut(owner, kind)?.claim(self.pool_slot);
        self.pool_slot = Some(slot);
        Ok(slot)
    }

    /// One controller per (phase, node) pair, in declaration order.
    pub fn controllers<'p>(
        &self,
        program: &'p Program,
    ) -> Result<Vec<PenaltyController<'p>>, LinkError> {
        let phases = self.phase_indices(program.n_phases())?;
        self.nodes
            .iter()
            .zip(phases)
            .enumerate()
            .map(|(position, (node, phase))| {
                program.controller(phase, *node).map_err(|err| match err {
                    LinkError::InvalidNodeSpecifier { node, .. } => {
                        LinkError::InvalidNodeSpecifier { position, node }
                    }
                    other => other,
                })
            })
            .collect()
    }

    /// Builds the residual through the link function.
    pub fn realize<C: ControllerView>(&self, controllers: &mut [C]) -> Result<Vec<Exp>, LinkError> {
        self.function.realize(self, controllers)
    }

    /// Packs a realized residual into a pool entry.
    ///
    /// # Errors
    ///
    /// [`LinkError::InvalidCallerUsage`] when fewer than two controllers are given.
    pub fn pool_entry<C: ControllerView>(
        &self,
        controllers: &[C],
        residual: Vec<Exp>,
    ) -> Result<PoolEntry, LinkError> {
        if controllers.len() < 2 {
            return Err(LinkError::InvalidCallerUsage(format!(
                "multinode pool registration needs a sequence of controllers, got {}",
                controllers.len()
            )));
        }
        let nodes = controllers
            .iter()
            .map(|controller| LinkedNode {
                phase: controller.phase_idx(),
                node: controller.node_index(),
                occurrence: controller.occurrence(),
            })
            .collect();
        let penalty = match self.mode {
            LinkMode::Constraint => Penalty::Constraint {
                bounds: self.bounds,
            },
            LinkMode::WeightedObjective { weight } => Penalty::Objective {
                weight,
                quadratic: self.quadratic,
            },
        };
        Ok(PoolEntry {
            function: self.function.name().to_string(),
            residual,
            nodes,
            penalty,
            origin: self.to_string(),
        })
    }

    /// Stores `entry` in this link's slot.
    ///
    /// # Errors
    ///
    /// [`LinkError::InvalidCallerUsage`] when the link has no slot yet.
    pub fn add_to_pool(&self, program: &mut Program, entry: PoolEntry) -> Result<(), LinkError> {
        let slot = self.pool_slot.ok_or_else(|| {
            LinkError::InvalidCallerUsage(
                "multinode link registered before a pool slot was reserved".to_string(),
            )
        })?;
        let (owner, kind) = self.pool_location();
        program.pool_mut(owner, kind)?.install(slot, entry)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function.name())?;
        for (idx, (node, phase)) in self.nodes.iter().zip(&self.nodes_phase).enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "phase {phase} node {node}")?;
        }
        write!(f, ")")?;
        match self.mode {
            LinkMode::Constraint => write!(f, " in [{}, {}]", self.bounds.min, self.bounds.max),
            LinkMode::WeightedObjective { weight } => write!(f, " weight {weight}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::PhaseConfig;

    fn options() -> LinkOptions {
        LinkOptions::new([Node::End, Node::Start], [0, 1])
    }

    #[test]
    fn rejects_group_node_selectors() {
        let err = Link::new(
            LinkFunction::StatesEquality,
            LinkOptions::new([Node::Start, Node::All], [0, 0]),
        )
        .expect_err("All is not a single node");
        assert_eq!(
            err,
            LinkError::InvalidNodeSpecifier {
                position: 1,
                node: Node::All
            }
        );
    }

    #[test]
    fn rejects_negative_node_index() {
        let err = Link::new(
            LinkFunction::StatesEquality,
            LinkOptions::new([Node::Index(-1), Node::Start], [0, 0]),
        )
        .expect_err("negative index");
        assert!(matches!(err, LinkError::InvalidNodeSpecifier { position: 0, .. }));
    }

    #[test]
    fn rejects_mismatched_phase_count() {
        let err = Link::new(
            LinkFunction::StatesEquality,
            LinkOptions::new([Node::Start, Node::End], [0]),
        )
        .expect_err("arity");
        assert_eq!(err, LinkError::ArityMismatch { nodes: 2, phases: 1 });
    }

    #[test]
    fn rejects_single_node() {
        let err = Link::new(LinkFunction::StatesEquality, LinkOptions::new([Node::Start], [0]))
            .expect_err("one node");
        assert_eq!(err, LinkError::TooFewNodes { count: 1 });
    }

    #[test]
    fn weight_decides_mode_and_pool() {
        let constraint = Link::new(LinkFunction::StatesEquality, options()).expect("link");
        assert_eq!(constraint.mode(), LinkMode::Constraint);
        assert_eq!(constraint.bounds(), BoundInterval::new(0.0, 0.0));
        assert_eq!(
            constraint.pool_location(),
            (PoolOwner::Program, PoolKind::Constraint)
        );

        let objective = Link::new(
            LinkFunction::StatesEquality,
            LinkOptions::new([Node::Start, Node::Index(5)], [2, 2]).weight(10.0),
        )
        .expect("link");
        assert_eq!(objective.mode(), LinkMode::WeightedObjective { weight: 10.0 });
        assert_eq!(
            objective.pool_location(),
            (PoolOwner::Phase(2), PoolKind::Objective)
        );
    }

    #[test]
    fn foreign_functions_are_wrapped_unless_tag_is_preserved() {
        let foreign = || {
            LinkSpec::foreign("continuous", |_, _, _| {
                Ok(vec![Exp::val(0.0)])
            })
        };
        let wrapped = Link::new(foreign(), options()).expect("link");
        assert_eq!(wrapped.function().name(), "custom");

        let tagged = Link::new(foreign(), options().preserve_tag(true)).expect("link");
        assert_eq!(tagged.function().name(), "continuous");
    }

    #[test]
    fn slot_is_reused_across_preparations() {
        let mut program = Program::new();
        program.add_phase(PhaseConfig::new(4).state("q", 1));
        program.add_phase(PhaseConfig::new(4).state("q", 1));
        let mut link = Link::new(LinkFunction::StatesEquality, options()).expect("link");

        let first = link.ensure_pool_slot(&mut program).expect("slot");
        let second = link.ensure_pool_slot(&mut program).expect("slot");
        assert_eq!(first, second);
        assert_eq!(
            program
                .pool(PoolOwner::Program, PoolKind::Constraint)
                .map(|pool| pool.len()),
            Some(1)
        );
    }

    #[test]
    fn pending_links_never_share_a_slot() {
        let mut program = Program::new();
        program.add_phase(PhaseConfig::new(4).state("q", 1));
        program.add_phase(PhaseConfig::new(4).state("q", 1));
        let mut first = Link::new(LinkFunction::StatesEquality, options()).expect("link");
        let mut second = Link::new(LinkFunction::StatesEquality, options()).expect("link");

        let slots = [
            first.ensure_pool_slot(&mut program).expect("slot"),
            second.ensure_pool_slot(&mut program).expect("slot"),
        ];
        assert_eq!(slots, [0, 1]);

        for link in [&first, &second] {
            let mut controllers = link.controllers(&program).expect("controllers");
            let residual = link.realize(&mut controllers).expect("residual");
            let entry = link.pool_entry(&controllers, residual).expect("entry");
            drop(controllers);
            link.add_to_pool(&mut program, entry).expect("installed");
        }
        let pool = program
            .pool(PoolOwner::Program, PoolKind::Constraint)
            .expect("program pool");
        assert_eq!(pool.entries().count(), 2);
    }

    #[test]
    fn registration_requires_a_controller_sequence() {
        let mut program = Program::new();
        program.add_phase(PhaseConfig::new(4).state("q", 1));
        program.add_phase(PhaseConfig::new(4).state("q", 1));
        let link = Link::new(LinkFunction::StatesEquality, options()).expect("link");

        let controllers = link.controllers(&program).expect("controllers");
        let err = link
            .pool_entry(&controllers[..1], Vec::new())
            .expect_err("single controller");
        assert!(matches!(err, LinkError::InvalidCallerUsage(_)));

        let entry = link.pool_entry(&controllers, Vec::new()).expect("entry");
        drop(controllers);
        let err = link.add_to_pool(&mut program, entry).expect_err("no slot yet");
        assert!(matches!(err, LinkError::InvalidCallerUsage(_)));
    }

    #[test]
    fn display_lists_nodes_and_mode() {
        let link = Link::new(LinkFunction::StatesEquality, options()).expect("link");
        assert_eq!(
            link.to_string(),
            "states_equality(phase 0 node end, phase 1 node start) in [0, 0]"
        );
    }
}
