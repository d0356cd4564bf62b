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

//! Per-(phase, node) views handed to link functions.

use constraint_solver::Exp;
use std::collections::HashMap;
use std::ops::Range;

use crate::biomodel::BiomechanicalModel;
use crate::program::{Program, VariableBlock};
use crate::symbolic::CompiledFunction;
use crate::LinkError;

/// Key selecting the concatenation of every block of a [`VariableSet`].
pub const ALL_VARIABLES: &str = "all";

/// Named symbolic blocks of one controller (states or controls).
#[derive(Debug, Clone)]
pub struct VariableSet {
    phase: usize,
    blocks: Vec<(String, Vec<Exp>)>,
}

impl VariableSet {
    pub fn new(phase: usize, blocks: Vec<(String, Vec<Exp>)>) -> Self {
        Self { phase, blocks }
    }

    /// Block names in layout order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|(name, _)| name.as_str())
    }

    /// Blocks in layout order.
    pub fn blocks(&self) -> &[(String, Vec<Exp>)] {
        &self.blocks
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.blocks.iter().map(|(_, cx)| cx.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenation of every block.
    pub fn all(&self) -> Vec<Exp> {
        self.blocks
            .iter()
            .flat_map(|(_, cx)| cx.iter().cloned())
            .collect()
    }

    /// Symbols of block `key`, or of every block for [`ALL_VARIABLES`].
    pub fn get(&self, key: &str) -> Result<Vec<Exp>, LinkError> {
        if key == ALL_VARIABLES {
            return Ok(self.all());
        }
        self.blocks
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, cx)| cx.clone())
            .ok_or_else(|| LinkError::UnknownVariable {
                phase: self.phase,
                key: key.to_string(),
            })
    }

    /// Rows of block `key` inside [`VariableSet::all`].
    pub fn index(&self, key: &str) -> Result<Range<usize>, LinkError> {
        let mut start = 0;
        for (name, cx) in &self.blocks {
            if name == key {
                return Ok(start..start + cx.len());
            }
            start += cx.len();
        }
        Err(LinkError::UnknownVariable {
            phase: self.phase,
            key: key.to_string(),
        })
    }

    /// Binds block `key` to numeric values.
    pub fn bind(&self, key: &str, values: &[f64]) -> Result<HashMap<String, f64>, LinkError> {
        let cx = self.get(key)?;
        if cx.len() != values.len() {
            return Err(LinkError::ShapeMismatch {
                function: format!("bind '{key}'"),
                first: cx.len(),
                other: values.len(),
                position: 0,
            });
        }
        let mut env = HashMap::with_capacity(cx.len());
        for (exp, value) in cx.iter().zip(values) {
            if let Exp::Var(name) = exp {
                env.insert(name.clone(), *value);
            }
        }
        Ok(env)
    }
}

/// Named entry of the program parameter vector.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub cx: Exp,
}

/// What a link function may ask of one (phase, node) participant.
pub trait ControllerView {
    /// Index of the owning phase.
    fn phase_idx(&self) -> usize;

    /// Resolved node index inside the phase.
    fn node_index(&self) -> usize;

    /// State symbols for the current occurrence.
    fn states(&self) -> VariableSet;

    /// Control symbols for the current occurrence.
    fn controls(&self) -> VariableSet;

    /// Program parameter vector.
    fn parameters(&self) -> Vec<Parameter>;

    /// Model of the owning phase.
    fn model(&self) -> Result<&dyn BiomechanicalModel, LinkError>;

    /// Compiles `outputs` as a function of `inputs`.
    fn compile(
        &self,
        name: &str,
        outputs: Vec<Exp>,
        inputs: &[&[Exp]],
    ) -> Result<CompiledFunction, LinkError> {
        CompiledFunction::compile(name, outputs, inputs)
    }

    /// Which symbolic instance of the phase this controller exposes.
    fn occurrence(&self) -> usize;

    fn set_occurrence(&mut self, occurrence: usize);
}

/// [`ControllerView`] over a [`Program`] phase.
///
/// State and control symbols are the phase's shared node symbols:
/// `x<occ>_p<phase>_<block>_<row>` and `u<occ>_p<phase>_<block>_<row>`.
/// The occurrence index selects between simultaneous instances when a link
/// uses the same phase more than once.
#[derive(Debug, Clone)]
pub struct PenaltyController<'a> {
    program: &'a Program,
    phase_idx: usize,
    node_index: usize,
    occurrence: usize,
}

impl<'a> PenaltyController<'a> {
    pub(crate) fn new(program: &'a Program, phase_idx: usize, node_index: usize) -> Self {
        Self {
            program,
            phase_idx,
            node_index,
            occurrence: 0,
        }
    }

    fn layout(&self, prefix: char, blocks: &[VariableBlock]) -> VariableSet {
        let blocks = blocks
            .iter()
            .map(|block| {
                let cx = (0..block.size)
                    .map(|row| {
                        Exp::var(format!(
                            "{prefix}{}_p{}_{}_{row}",
                            self.occurrence, self.phase_idx, block.name
                        ))
                    })
                    .collect();
                (block.name.clone(), cx)
            })
            .collect();
        VariableSet::new(self.phase_idx, blocks)
    }

    fn blocks(&self) -> (&'a [VariableBlock], &'a [VariableBlock]) {
        match self.program.phase(self.phase_idx) {
            Some(phase) => (
                phase.config().states.as_slice(),
                phase.config().controls.as_slice(),
            ),
            None => (&[][..], &[][..]),
        }
    }

    /// Numeric environment binding state block `key` of this controller.
    pub fn bind_states(&self, key: &str, values: &[f64]) -> Result<HashMap<String, f64>, LinkError> {
        self.states().bind(key, values)
    }

    /// Numeric environment binding control block `key` of this controller.
    pub fn bind_controls(
        &self,
        key: &str,
        values: &[f64],
    ) -> Result<HashMap<String, f64>, LinkError> {
        self.controls().bind(key, values)
    }
}

impl ControllerView for PenaltyController<'_> {
    fn phase_idx(&self) -> usize {
        self.phase_idx
    }

    fn node_index(&self) -> usize {
        self.node_index
    }

    fn states(&self) -> VariableSet {
        let (states, _) = self.blocks();
        self.layout('x', states)
    }

    fn controls(&self) -> VariableSet {
        let (_, controls) = self.blocks();
        self.layout('u', controls)
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.program
            .parameters()
            .iter()
            .map(|name| Parameter {
                name: name.clone(),
                cx: Exp::var(name.clone()),
            })
            .collect()
    }

    fn model(&self) -> Result<&dyn BiomechanicalModel, LinkError> {
        self.program
            .phase(self.phase_idx)
            .and_then(|phase| phase.model())
            .ok_or(LinkError::MissingModel {
                phase: self.phase_idx,
            })
    }

    fn occurrence(&self) -> usize {
        self.occurrence
    }

    fn set_occurrence(&mut self, occurrence: usize) {
        self.occurrence = occurrence;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::PhaseConfig;

    fn program() -> Program {
        let mut program = Program::new();
        program.add_phase(PhaseConfig::new(10).state("q", 2).state("qdot", 2).control("tau", 2));
        program
    }

    #[test]
    fn all_concatenates_blocks_in_order() {
        let program = program();
        let controller = program.controller(0, crate::Node::Start).expect("controller");
        let states = controller.states();
        assert_eq!(states.len(), 4);
        assert_eq!(states.names().collect::<Vec<_>>(), vec!["q", "qdot"]);
        assert_eq!(states.index("qdot").expect("qdot"), 2..4);
        assert!(matches!(
            states.get("tau"),
            Err(LinkError::UnknownVariable { phase: 0, .. })
        ));
        assert_eq!(controller.controls().len(), 2);
    }

    #[test]
    fn occurrence_selects_symbol_instance() {
        let program = program();
        let mut controller = program.controller(0, crate::Node::End).expect("controller");
        let first = controller.bind_states("q", &[1.0, 2.0]).expect("bind");
        assert!(first.contains_key("x0_p0_q_0"));

        controller.set_occurrence(1);
        let second = controller.bind_states("q", &[1.0, 2.0]).expect("bind");
        assert!(second.contains_key("x1_p0_q_1"));
        assert!(!second.contains_key("x0_p0_q_1"));
    }

    #[test]
    fn missing_model_is_reported() {
        let program = program();
        let controller = program.controller(0, crate::Node::Start).expect("controller");
        assert!(matches!(
            controller.model(),
            Err(LinkError::MissingModel { phase: 0 })
        ));
    }

    #[test]
    fn bind_checks_length() {
        let program = program();
        let controller = program.controller(0, crate::Node::Start).expect("controller");
        assert!(controller.bind_controls("tau", &[1.0]).is_err());
    }
}
