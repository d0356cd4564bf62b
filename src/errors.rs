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

//! Error types surfaced by link validation, preparation and realization.

use thiserror::Error;

use crate::node::Node;

/// Errors produced while declaring, preparing or realizing multinode links.
///
/// Every variant describes a model-definition mistake. None of them is
/// transient, so callers are expected to stop assembly and report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    /// A node is neither `Start`, `Mid`, `Penultimate`, `End` nor a non-negative index.
    #[error(
        "Multinode links only work with Node::Start, Node::Mid, Node::Penultimate, Node::End \
         or a node index, got {node} at position {position}"
    )]
    InvalidNodeSpecifier { position: usize, node: Node },
    /// A phase index falls outside `[0, n_phases)`.
    #[error("nodes_phase must be between 0 and the number of phases ({n_phases}), got {phase}")]
    InvalidPhaseIndex { phase: i64, n_phases: usize },
    /// `nodes` and `nodes_phase` have different lengths.
    #[error("each node must have a corresponding phase ({nodes} nodes, {phases} phases)")]
    ArityMismatch { nodes: usize, phases: usize },
    /// A link must couple at least two nodes.
    #[error("a multinode link needs at least two nodes, got {count}")]
    TooFewNodes { count: usize },
    /// Paired controllers expose vectors of different sizes.
    #[error(
        "{function}: continuity can't be established since {first} values are matched at the first \
         node and {other} at node {position}; use a custom function or supply a states mapping"
    )]
    ShapeMismatch {
        function: String,
        first: usize,
        other: usize,
        position: usize,
    },
    /// Phase-duration link on a phase without a `time_phase_<idx>` parameter.
    #[error(
        "time link can't be established since the {role} phase ({phase}) has no time parameter; \
         register a time objective or a time constraint on that phase first"
    )]
    MissingTimeParameter { phase: usize, role: &'static str },
    /// The pool-registration entry point was misused.
    #[error("invalid caller usage: {0}")]
    InvalidCallerUsage(String),
    /// A resolved node index does not exist in its phase.
    #[error("node {node} is out of range for phase {phase} ({n_shooting} shooting nodes)")]
    NodeOutOfRange {
        phase: usize,
        node: i64,
        n_shooting: usize,
    },
    /// `Node::Mid` requires an even shooting count.
    #[error("number of shooting points must be even to use Node::Mid (phase {phase} has {n_shooting})")]
    MidNodeParity { phase: usize, n_shooting: usize },
    /// A named variable block is not part of the controller layout.
    #[error("variable '{key}' is not defined in phase {phase}")]
    UnknownVariable { phase: usize, key: String },
    /// A mapping refers to a row the mapped vector does not have.
    #[error("mapping refers to row {index} of a vector with {len} rows")]
    MappingIndexOutOfRange { index: usize, len: usize },
    /// A link function received the wrong number of controllers.
    #[error("{function} expects {expected} controllers, got {actual}")]
    ControllerCount {
        function: String,
        expected: usize,
        actual: usize,
    },
    /// The phase has no biomechanical model attached.
    #[error("phase {phase} has no biomechanical model")]
    MissingModel { phase: usize },
    /// Building or calling a compiled function failed.
    #[error("function '{name}': {reason}")]
    Compile { name: String, reason: String },
    /// Error reported by a user-supplied residual function.
    #[error("custom link function failed: {0}")]
    UserFunction(String),
}

impl LinkError {
    pub(crate) fn compile(name: &str, reason: impl Into<String>) -> Self {
        LinkError::Compile {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
