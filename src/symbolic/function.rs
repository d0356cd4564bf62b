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

//! Named symbolic functions with explicit inputs.
//!
//! Compiling freezes an output expression against a list of symbolic input
//! vectors. The result can then be called with other expressions (symbolic
//! substitution) or with numbers.

use constraint_solver::Exp;
use std::collections::{BTreeSet, HashMap};

use super::{collect_var_names, evaluate_exp, substitute, symbol_name};
use crate::LinkError;

/// A symbolic function `f(inputs...) -> outputs`.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    name: String,
    inputs: Vec<Vec<String>>,
    outputs: Vec<Exp>,
}

impl CompiledFunction {
    /// Builds a function over `inputs`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Compile`] when an input element is not a bare
    /// symbol, when a symbol is repeated across inputs, or when `outputs`
    /// depends on a symbol that no input provides.
    pub fn compile(name: &str, outputs: Vec<Exp>, inputs: &[&[Exp]]) -> Result<Self, LinkError> {
        let mut declared = BTreeSet::new();
        let mut input_names = Vec::with_capacity(inputs.len());
        for (input_idx, input) in inputs.iter().enumerate() {
            let mut names = Vec::with_capacity(input.len());
            for (row, exp) in input.iter().enumerate() {
                let symbol = symbol_name(exp).ok_or_else(|| {
                    LinkError::compile(
                        name,
                        format!("input {input_idx} row {row} is not a purely symbolic value"),
                    )
                })?;
                if !declared.insert(symbol.to_string()) {
                    return Err(LinkError::compile(
                        name,
                        format!("symbol '{symbol}' is declared by more than one input"),
                    ));
                }
                names.push(symbol.to_string());
            }
            input_names.push(names);
        }

        let mut free = BTreeSet::new();
        for output in &outputs {
            collect_var_names(output, &mut free);
        }
        if let Some(missing) = free.difference(&declared).next() {
            return Err(LinkError::compile(
                name,
                format!("free variable '{missing}' is not an input"),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            inputs: input_names,
            outputs,
        })
    }

    /// Function name given at compile time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of output rows.
    pub fn n_out(&self) -> usize {
        self.outputs.len()
    }

    /// Calls the function with symbolic arguments.
    pub fn call(&self, args: &[&[Exp]]) -> Result<Vec<Exp>, LinkError> {
        self.check_arity(args.iter().map(|arg| arg.len()))?;
        let mut bindings = HashMap::new();
        for (names, arg) in self.inputs.iter().zip(args) {
            for (name, value) in names.iter().zip(arg.iter()) {
                bindings.insert(name.clone(), value.clone());
            }
        }
        Ok(self
            .outputs
            .iter()
            .map(|output| substitute(output, &bindings))
            .collect())
    }

    /// Evaluates the function numerically.
    pub fn eval(&self, args: &[&[f64]]) -> Result<Vec<f64>, LinkError> {
        self.check_arity(args.iter().map(|arg| arg.len()))?;
        let mut env = HashMap::new();
        for (names, arg) in self.inputs.iter().zip(args) {
            for (name, value) in names.iter().zip(arg.iter()) {
                env.insert(name.clone(), *value);
            }
        }
        self.outputs
            .iter()
            .map(|output| {
                // Compile guarantees every free variable is an input.
                evaluate_exp(output, &env)
                    .ok_or_else(|| LinkError::compile(&self.name, "unbound input during evaluation"))
            })
            .collect()
    }

    fn check_arity(&self, lens: impl ExactSizeIterator<Item = usize>) -> Result<(), LinkError> {
        if lens.len() != self.inputs.len() {
            return Err(LinkError::compile(
                &self.name,
                format!("expected {} arguments, got {}", self.inputs.len(), lens.len()),
            ));
        }
        for (idx, (len, names)) in lens.zip(&self.inputs).enumerate() {
            if len != names.len() {
                return Err(LinkError::compile(
                    &self.name,
                    format!(
                        "argument {idx} has {len} rows, expected {}",
                        names.len()
                    ),
                ));
            }
        }
        Ok(())
    }
}
