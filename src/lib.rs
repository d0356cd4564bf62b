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

//! Multinode links for multiphase optimal control.
//!
//! A link couples state, control or derived values taken at different time
//! nodes, possibly of different phases, into one residual expression. The
//! residual becomes either an equality/interval constraint or a weighted
//! objective term of the global nonlinear program.
//!
//! # Pipeline
//!
//! 1. Declare links in a [`LinkCollection`] ([`LinkOptions`] carries nodes,
//!    phases, weight, bounds and mapping).
//! 2. [`LinkCollection::prepare`] checks phase references against the
//!    [`Program`] and decides each link's realization path.
//! 3. Each link reserves (or reuses) a slot in the constraint or objective
//!    pool of its phase, or of the program when it spans phases.
//! 4. The [`LinkFunction`] builds the residual from one
//!    [`ControllerView`] per (phase, node).
//! 5. The residual is installed in the reserved slot as a [`PoolEntry`].
//!
//! [`assemble_links`] runs steps 2 to 5.
//!
//! # Symbols
//!
//! Residuals are vectors of scalar `constraint_solver::Exp` rows. Controllers
//! expose the phase's shared node symbols; when a link uses the same phase
//! more than once, each use gets its own occurrence index and therefore its
//! own symbols.

mod assembly;
mod biomodel;
mod controller;
mod errors;
mod link;
mod mapping;
mod node;
mod program;
pub mod symbolic;

pub use assembly::assemble_links;
pub use biomodel::{BiomechanicalModel, PlanarChain, Segment};
pub use controller::{ControllerView, Parameter, PenaltyController, VariableSet, ALL_VARIABLES};
pub use errors::LinkError;
pub use link::{
    prepare_controller_cx, BoundInterval, CustomLinkFn, ExtraParams, Link, LinkCollection,
    LinkFunction, LinkMode, LinkOptions, LinkSpec, RealizationPath,
};
pub use mapping::{MapIndex, Mapping, PhaseMapping};
pub use node::Node;
pub use program::{
    time_parameter_name, LinkedNode, Penalty, Phase, PhaseConfig, Pool, PoolEntry, PoolKind,
    PoolOwner, PoolSlot, Program, VariableBlock, DEFAULT_N_SHOOTING,
};
