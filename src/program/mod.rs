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

//! Program context consumed by the link layer.
//!
//! A [`Program`] owns the phases (configuration, optional model and the
//! phase-local pools), the program-wide pools used by links spanning phases,
//! and the named global parameters.

mod pool;

pub use pool::{LinkedNode, Penalty, Pool, PoolEntry, PoolSlot};

use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::debug;

use crate::biomodel::BiomechanicalModel;
use crate::controller::PenaltyController;
use crate::node::Node;
use crate::LinkError;

/// Default number of shooting intervals of a phase.
pub const DEFAULT_N_SHOOTING: usize = 30;

/// Named block of a state or control layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableBlock {
    pub name: String,
    pub size: usize,
}

impl VariableBlock {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Per-phase configuration record.
///
/// Defaults: [`DEFAULT_N_SHOOTING`] intervals, no states, no controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Number of shooting intervals; nodes run from `0` to `n_shooting`.
    pub n_shooting: usize,
    /// Ordered state blocks (e.g. `q`, `qdot`).
    pub states: Vec<VariableBlock>,
    /// Ordered control blocks (e.g. `tau`).
    pub controls: Vec<VariableBlock>,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            n_shooting: DEFAULT_N_SHOOTING,
            states: Vec::new(),
            controls: Vec::new(),
        }
    }
}

impl PhaseConfig {
    /// Creates an empty layout with `n_shooting` intervals.
    pub fn new(n_shooting: usize) -> Self {
        Self {
            n_shooting,
            ..Self::default()
        }
    }

    /// Appends a state block.
    pub fn state(mut self, name: &str, size: usize) -> Self {
        self.states.push(VariableBlock::new(name, size));
        self
    }

    /// Appends a control block.
    pub fn control(mut self, name: &str, size: usize) -> Self {
        self.controls.push(VariableBlock::new(name, size));
        self
    }

    /// Total number of state rows.
    pub fn nx(&self) -> usize {
        self.states.iter().map(|block| block.size).sum()
    }

    /// Total number of control rows.
    pub fn nu(&self) -> usize {
        self.controls.iter().map(|block| block.size).sum()
    }
}

/// Where a pool lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolOwner {
    /// Pool of one phase, used by links whose nodes all live in it.
    Phase(usize),
    /// Program-wide pool, used by links spanning phases.
    Program,
}

/// Which pool of an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// Constraint pool (`g_internal`).
    Constraint,
    /// Objective pool (`J_internal`).
    Objective,
}

/// One phase of the program.
#[derive(Debug, Clone)]
pub struct Phase {
    config: PhaseConfig,
    model: Option<Rc<dyn BiomechanicalModel>>,
    g_internal: Pool,
    j_internal: Pool,
}

impl Phase {
    pub fn config(&self) -> &PhaseConfig {
        &self.config
    }

    pub fn model(&self) -> Option<&dyn BiomechanicalModel> {
        self.model.as_deref()
    }

    pub fn constraint_pool(&self) -> &Pool {
        &self.g_internal
    }

    pub fn objective_pool(&self) -> &Pool {
        &self.j_internal
    }
}

/// Multiphase program context.
#[derive(Debug, Clone, Default)]
pub struct Program {
    phases: Vec<Phase>,
    parameters: Vec<String>,
    g_internal: Pool,
    j_internal: Pool,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a phase without a biomechanical model and returns its index.
    pub fn add_phase(&mut self, config: PhaseConfig) -> usize {
        self.push_phase(config, None)
    }

    /// Adds a phase driven by `model` and returns its index.
    pub fn add_phase_with_model(
        &mut self,
        config: PhaseConfig,
        model: Rc<dyn BiomechanicalModel>,
    ) -> usize {
        self.push_phase(config, Some(model))
    }

    fn push_phase(&mut self, config: PhaseConfig, model: Option<Rc<dyn BiomechanicalModel>>) -> usize {
        self.phases.push(Phase {
            config,
            model,
            g_internal: Pool::new(),
            j_internal: Pool::new(),
        });
        self.phases.len() - 1
    }

    pub fn n_phases(&self) -> usize {
        self.phases.len()
    }

    pub fn phase(&self, idx: usize) -> Option<&Phase> {
        self.phases.get(idx)
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    fn checked_phase(&self, idx: usize) -> Result<&Phase, LinkError> {
        self.phases.get(idx).ok_or(LinkError::InvalidPhaseIndex {
            phase: idx as i64,
            n_phases: self.phases.len(),
        })
    }

    /// Registers the duration parameter `time_phase_<phase>`.
    ///
    /// This is what a time objective or time constraint does on a phase.
    /// Registering the same phase twice is a no-op.
    pub fn add_time_parameter(&mut self, phase: usize) -> Result<(), LinkError> {
        self.checked_phase(phase)?;
        let name = time_parameter_name(phase);
        if !self.parameters.contains(&name) {
            debug!(phase, parameter = %name, "registered phase time parameter");
            self.parameters.push(name);
        }
        Ok(())
    }

    /// Names of the global parameters, in registration order.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Pool of `owner` for `kind`, `None` for an unknown phase.
    pub fn pool(&self, owner: PoolOwner, kind: PoolKind) -> Option<&Pool> {
        let (g, j) = match owner {
            PoolOwner::Program => (&self.g_internal, &self.j_internal),
            PoolOwner::Phase(idx) => {
                let phase = self.phases.get(idx)?;
                (&phase.g_internal, &phase.j_internal)
            }
        };
        Some(match kind {
            PoolKind::Constraint => g,
            PoolKind::Objective => j,
        })
    }

    /// Mutable pool of `owner` for `kind`.
    pub fn pool_mut(&mut self, owner: PoolOwner, kind: PoolKind) -> Result<&mut Pool, LinkError> {
        let n_phases = self.phases.len();
        let (g, j) = match owner {
            PoolOwner::Program => (&mut self.g_internal, &mut self.j_internal),
            PoolOwner::Phase(idx) => {
                let phase = self
                    .phases
                    .get_mut(idx)
                    .ok_or(LinkError::InvalidPhaseIndex {
                        phase: idx as i64,
                        n_phases,
                    })?;
                (&mut phase.g_internal, &mut phase.j_internal)
            }
        };
        Ok(match kind {
            PoolKind::Constraint => g,
            PoolKind::Objective => j,
        })
    }

    /// Builds the controller of `node` in `phase`.
    pub fn controller(&self, phase: usize, node: Node) -> Result<PenaltyController<'_>, LinkError> {
        let config = self.checked_phase(phase)?.config();
        let node_index = node.resolve(phase, config.n_shooting)?;
        Ok(PenaltyController::new(self, phase, node_index))
    }
}

/// Name of the duration parameter of `phase`.
pub fn time_parameter_name(phase: usize) -> String {
    format!("time_phase_{phase}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_config_defaults() {
        let config = PhaseConfig::default();
        assert_eq!(config.n_shooting, DEFAULT_N_SHOOTING);
        assert_eq!(config.nx(), 0);
        assert_eq!(config.nu(), 0);
    }

    #[test]
    fn phase_config_loads_from_json() {
        let config: PhaseConfig = serde_json::from_str(
            r#"{"n_shooting": 20, "states": [{"name": "q", "size": 2}, {"name": "qdot", "size": 2}]}"#,
        )
        .expect("valid config");
        assert_eq!(config.n_shooting, 20);
        assert_eq!(config.nx(), 4);
        assert!(config.controls.is_empty());
    }

    #[test]
    fn time_parameter_registration_is_idempotent() {
        let mut program = Program::new();
        program.add_phase(PhaseConfig::new(10));
        program.add_time_parameter(0).expect("phase 0 exists");
        program.add_time_parameter(0).expect("phase 0 exists");
        assert_eq!(program.parameters(), ["time_phase_0".to_string()]);
        assert!(matches!(
            program.add_time_parameter(3),
            Err(LinkError::InvalidPhaseIndex { phase: 3, n_phases: 1 })
        ));
    }

    #[test]
    fn controller_resolves_node_against_phase() {
        let mut program = Program::new();
        program.add_phase(PhaseConfig::new(8).state("q", 1));
        let controller = program.controller(0, Node::Mid).expect("mid exists");
        assert_eq!(crate::ControllerView::node_index(&controller), 4);
        assert!(program.controller(0, Node::Index(9)).is_err());
        assert!(program.controller(1, Node::Start).is_err());
    }
}
