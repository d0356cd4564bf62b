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

//! Reusable slot pools holding realized penalties.
//!
//! Slots are addressed by index. A link keeps the index it was given so a
//! later assembly pass rewrites the same slot instead of appending.

use constraint_solver::Exp;
use std::collections::HashMap;
use tracing::debug;

use crate::link::BoundInterval;
use crate::symbolic::evaluate_all;
use crate::LinkError;

/// One (phase, node) taking part in a realized link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedNode {
    pub phase: usize,
    pub node: usize,
    /// Which symbolic instance of the phase the residual uses for this node.
    pub occurrence: usize,
}

/// How a realized residual enters the program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Penalty {
    /// Every residual row must stay within `bounds`.
    Constraint { bounds: BoundInterval },
    /// Residual rows are penalized with `weight`, squared when `quadratic`.
    Objective { weight: f64, quadratic: bool },
}

/// Realized residual stored in a pool slot.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub(crate) function: String,
    pub(crate) residual: Vec<Exp>,
    pub(crate) nodes: Vec<LinkedNode>,
    pub(crate) penalty: Penalty,
    pub(crate) origin: String,
}

impl PoolEntry {
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn residual(&self) -> &[Exp] {
        &self.residual
    }

    pub fn nodes(&self) -> &[LinkedNode] {
        &self.nodes
    }

    pub fn penalty(&self) -> Penalty {
        self.penalty
    }

    /// Human-readable description of the link this entry was realized from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Constraint bounds expanded to one `(min, max)` pair per residual row.
    pub fn bounds_rows(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        match self.penalty {
            Penalty::Constraint { bounds } => {
                let n = self.residual.len();
                Some((vec![bounds.min; n], vec![bounds.max; n]))
            }
            Penalty::Objective { .. } => None,
        }
    }

    /// Numeric residual rows, `None` when a symbol is unbound in `env`.
    pub fn residual_values(&self, env: &HashMap<String, f64>) -> Option<Vec<f64>> {
        evaluate_all(&self.residual, env)
    }

    /// Objective contribution; `None` for constraints or unbound symbols.
    pub fn objective_value(&self, env: &HashMap<String, f64>) -> Option<f64> {
        let Penalty::Objective { weight, quadratic } = self.penalty else {
            return None;
        };
        let values = self.residual_values(env)?;
        let total: f64 = if quadratic {
            values.iter().map(|v| v * v).sum()
        } else {
            values.iter().sum()
        };
        Some(weight * total)
    }

    /// Whether every row lies within the constraint bounds (up to `tolerance`).
    ///
    /// `None` for objectives or unbound symbols.
    pub fn is_satisfied(&self, env: &HashMap<String, f64>, tolerance: f64) -> Option<bool> {
        let Penalty::Constraint { bounds } = self.penalty else {
            return None;
        };
        let values = self.residual_values(env)?;
        Some(
            values
                .iter()
                .all(|v| *v >= bounds.min - tolerance && *v <= bounds.max + tolerance),
        )
    }
}

/// State of one pool slot.
#[derive(Debug, Clone, Default)]
pub enum PoolSlot {
    #[default]
    Empty,
    /// Claimed by a link, waiting for its realized entry.
    Reserved,
    Occupied(PoolEntry),
}

impl PoolSlot {
    /// Whether the slot is free for a fresh claim.
    pub fn is_empty(&self) -> bool {
        matches!(self, PoolSlot::Empty)
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, PoolSlot::Reserved)
    }

    pub fn entry(&self) -> Option<&PoolEntry> {
        match self {
            PoolSlot::Occupied(entry) => Some(entry),
            PoolSlot::Empty | PoolSlot::Reserved => None,
        }
    }
}

/// Ordered, growable sequence of slots.
#[derive(Debug, Clone, Default)]
pub struct Pool {
    slots: Vec<PoolSlot>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[PoolSlot] {
        &self.slots
    }

    pub fn get(&self, idx: usize) -> Option<&PoolSlot> {
        self.slots.get(idx)
    }

    /// Entry stored at `idx`, if the slot exists and is occupied.
    pub fn entry(&self, idx: usize) -> Option<&PoolEntry> {
        self.slots.get(idx).and_then(PoolSlot::entry)
    }

    /// Occupied entries with their slot index.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &PoolEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.entry().map(|entry| (idx, entry)))
    }

    /// Reserves a slot and returns its index.
    ///
    /// Without a `previous` index, the first empty slot is claimed, or a new
    /// one is appended when none is free. With a `previous` index, the pool
    /// grows until that index exists and the slot's entry is dropped, so
    /// sibling indices never shift. Either way the slot is left
    /// [`PoolSlot::Reserved`] until [`Pool::install`] fills it.
    pub fn claim(&mut self, previous: Option<usize>) -> usize {
        let idx = match previous {
            None => match self.slots.iter().position(PoolSlot::is_empty) {
                Some(idx) => {
                    debug!(slot = idx, "claimed empty pool slot");
                    idx
                }
                None => {
                    self.slots.push(PoolSlot::Empty);
                    debug!(slot = self.slots.len() - 1, "appended pool slot");
                    self.slots.len() - 1
                }
            },
            Some(idx) => {
                if idx >= self.slots.len() {
                    self.slots.resize_with(idx + 1, PoolSlot::default);
                }
                debug!(slot = idx, "reset pool slot for re-realization");
                idx
            }
        };
        self.slots[idx] = PoolSlot::Reserved;
        idx
    }

    /// Stores `entry` at an existing slot.
    pub fn install(&mut self, idx: usize, entry: PoolEntry) -> Result<(), LinkError> {
        let len = self.slots.len();
        let slot = self.slots.get_mut(idx).ok_or_else(|| {
            LinkError::InvalidCallerUsage(format!(
                "pool slot {idx} does not exist (pool has {len} slots)"
            ))
        })?;
        *slot = PoolSlot::Occupied(entry);
        Ok(())
    }

    /// Frees the slot at `idx`. Out-of-range indices are ignored.
    pub fn release(&mut self, idx: usize) {
        if let Some(slot) = self.slots.get_mut(idx) {
            *slot = PoolSlot::Empty;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(penalty: Penalty) -> PoolEntry {
        PoolEntry {
            function: "test".to_string(),
            residual: vec![Exp::var("r".to_string())],
            nodes: Vec::new(),
            penalty,
            origin: String::new(),
        }
    }

    fn constraint() -> PoolEntry {
        entry(Penalty::Constraint {
            bounds: BoundInterval::default(),
        })
    }

    fn full_pool(n: usize) -> Pool {
        let mut pool = Pool::new();
        for _ in 0..n {
            let idx = pool.claim(None);
            pool.install(idx, constraint()).expect("slot exists");
        }
        pool
    }

    #[test]
    fn fresh_claim_appends_when_no_slot_is_free() {
        let mut pool = full_pool(2);
        assert_eq!(pool.claim(None), 2);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn fresh_claim_reuses_first_empty_slot() {
        let mut pool = full_pool(4);
        pool.release(1);
        pool.release(3);
        assert_eq!(pool.claim(None), 1);
        assert_eq!(pool.len(), 4);
    }

    #[test]
    fn reclaim_grows_and_clears() {
        let mut pool = full_pool(1);
        assert_eq!(pool.claim(Some(4)), 4);
        assert_eq!(pool.len(), 5);
        assert!(pool.slots()[1..4].iter().all(PoolSlot::is_empty));
        assert!(pool.get(4).is_some_and(PoolSlot::is_reserved));

        assert_eq!(pool.claim(Some(0)), 0);
        assert!(pool.get(0).is_some_and(PoolSlot::is_reserved));
        assert_eq!(pool.entry(0).map(PoolEntry::function), None);
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn pending_reservations_get_distinct_slots() {
        let mut pool = Pool::new();
        let first = pool.claim(None);
        let second = pool.claim(None);
        assert_eq!((first, second), (0, 1));
        assert_eq!(pool.len(), 2);

        pool.install(second, constraint()).expect("reserved slot");
        pool.release(first);
        assert!(pool.get(first).is_some_and(PoolSlot::is_empty));
        assert_eq!(pool.claim(None), first);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn fresh_claim_skips_reserved_slot_of_reclaimed_link() {
        let mut pool = full_pool(2);
        pool.release(0);
        assert_eq!(pool.claim(Some(0)), 0);
        assert_eq!(pool.claim(None), 2);
    }

    #[test]
    fn install_requires_existing_slot() {
        let mut pool = Pool::new();
        assert!(matches!(
            pool.install(0, constraint()),
            Err(LinkError::InvalidCallerUsage(_))
        ));
    }

    #[test]
    fn objective_value_is_weighted_square() {
        let e = entry(Penalty::Objective {
            weight: 2.0,
            quadratic: true,
        });
        let env: HashMap<String, f64> = [("r".to_string(), 3.0)].into_iter().collect();
        assert_eq!(e.objective_value(&env), Some(18.0));
        assert_eq!(e.is_satisfied(&env, 0.0), None);
        assert!(e.bounds_rows().is_none());
    }

    #[test]
    fn constraint_checks_bounds() {
        let e = constraint();
        let env: HashMap<String, f64> = [("r".to_string(), 1e-12)].into_iter().collect();
        assert_eq!(e.is_satisfied(&env, 1e-9), Some(true));
        assert_eq!(e.bounds_rows(), Some((vec![0.0], vec![0.0])));
        assert_eq!(e.objective_value(&env), None);
    }
}
