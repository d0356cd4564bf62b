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

//! Row mappings reconciling two phases' state layouts.

use constraint_solver::Exp;
use serde::{Deserialize, Serialize};

use crate::LinkError;

/// Source of one output row of a [`Mapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapIndex {
    /// Copy input row `i`.
    Index(usize),
    /// Copy input row `i` with the opposite sign.
    Opposite(usize),
    /// Constant zero row.
    Zero,
}

/// One-directional projection of a vector into another layout.
///
/// `None` rows means identity: the input passes through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    rows: Option<Vec<MapIndex>>,
}

impl Mapping {
    /// Pass-through mapping.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Mapping producing one output row per entry of `rows`.
    pub fn new(rows: Vec<MapIndex>) -> Self {
        Self { rows: Some(rows) }
    }

    /// Projects `input` through the mapping.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::MappingIndexOutOfRange`] when a row refers past the
    /// end of `input`.
    pub fn map(&self, input: &[Exp]) -> Result<Vec<Exp>, LinkError> {
        let Some(rows) = &self.rows else {
            return Ok(input.to_vec());
        };
        let fetch = |index: usize| {
            input
                .get(index)
                .cloned()
                .ok_or(LinkError::MappingIndexOutOfRange {
                    index,
                    len: input.len(),
                })
        };
        rows.iter()
            .map(|row| match *row {
                MapIndex::Index(i) => fetch(i),
                MapIndex::Opposite(i) => fetch(i).map(|exp| Exp::neg(exp)),
                MapIndex::Zero => Ok(Exp::val(0.0)),
            })
            .collect()
    }
}

/// Pair of projections attached to a link whose phases differ in layout.
///
/// `to_second` is applied to the first controller, `to_first` to every
/// other controller, so both sides land in a common layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseMapping {
    pub to_first: Mapping,
    pub to_second: Mapping,
}

impl PhaseMapping {
    /// Identity in both directions.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Builds a mapping from its two projections.
    pub fn new(to_first: Mapping, to_second: Mapping) -> Self {
        Self {
            to_first,
            to_second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::{evaluate_all, symbols};
    use std::collections::HashMap;

    fn env(values: &[f64]) -> HashMap<String, f64> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("x_{i}"), *v))
            .collect()
    }

    #[test]
    fn identity_passes_through() {
        let x = symbols("x", 3);
        let mapped = Mapping::identity().map(&x).expect("map");
        assert_eq!(evaluate_all(&mapped, &env(&[1.0, 2.0, 3.0])), Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn reorders_negates_and_pads() {
        let x = symbols("x", 2);
        let mapping = Mapping::new(vec![MapIndex::Index(1), MapIndex::Opposite(0), MapIndex::Zero]);
        let mapped = mapping.map(&x).expect("map");
        assert_eq!(mapped.len(), 3);
        assert_eq!(evaluate_all(&mapped, &env(&[4.0, 5.0])), Some(vec![5.0, -4.0, 0.0]));
    }

    #[test]
    fn out_of_range_row_is_reported() {
        let x = symbols("x", 2);
        let err = Mapping::new(vec![MapIndex::Index(2)]).map(&x).expect_err("row 2 missing");
        assert_eq!(err, LinkError::MappingIndexOutOfRange { index: 2, len: 2 });
    }
}
