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

//! Ordered link container and its preparation pass.

use std::fmt;
use tracing::{debug, warn};

use super::{BoundInterval, Link, LinkMode, LinkOptions, LinkSpec, RealizationPath};
use crate::program::Program;
use crate::LinkError;

/// Links in declaration order. Duplicates are kept.
#[derive(Debug, Clone, Default)]
pub struct LinkCollection {
    links: Vec<Link>,
}

impl LinkCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a link and returns its position.
    ///
    /// Anything that is not a library function is tagged as custom.
    pub fn add(&mut self, spec: impl Into<LinkSpec>, options: LinkOptions) -> Result<usize, LinkError> {
        let link = Link::new(spec, options)?;
        Ok(self.push(link))
    }

    /// Appends an already-built link.
    pub fn push(&mut self, link: Link) -> usize {
        self.links.push(link);
        self.links.len() - 1
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Link> {
        self.links.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Removes the link at `idx` and frees its pool slot.
    ///
    /// A slot whose pool is not in `program` is only logged.
    pub fn remove(&mut self, idx: usize, program: &mut Program) -> Option<Link> {
        if idx >= self.links.len() {
            return None;
        }
        let mut link = self.links.remove(idx);
        if let Some(slot) = link.clear_pool_slot() {
            let (owner, kind) = link.pool_location();
            match program.pool_mut(owner, kind) {
                Ok(pool) => {
                    pool.release(slot);
                    debug!(slot, "released pool slot of removed link");
                }
                Err(err) => warn!(slot, error = %err, "pool slot of removed link left in place"),
            }
        }
        Some(link)
    }

    /// Validates phase references and decides each link's realization path.
    ///
    /// Pools are left untouched.
    ///
    /// # Errors
    ///
    /// [`LinkError::InvalidPhaseIndex`] when a link refers to a phase outside
    /// `[0, n_phases)`.
    pub fn prepare(&mut self, program: &Program) -> Result<&mut [Link], LinkError> {
        let n_phases = program.n_phases();
        for link in &mut self.links {
            link.phase_indices(n_phases)?;
            let path = match link.mode() {
                LinkMode::Constraint => RealizationPath::Constraint,
                LinkMode::WeightedObjective { .. } => {
                    if link.bounds() != BoundInterval::equality() {
                        warn!(link = %link, "bounds are ignored for weighted multinode links");
                    }
                    RealizationPath::Mayer
                }
            };
            link.set_path(path);
        }
        debug!(links = self.links.len(), n_phases, "prepared multinode links");
        Ok(&mut self.links)
    }
}

impl<'a> IntoIterator for &'a LinkCollection {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

impl fmt::Display for LinkCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, link) in self.links.iter().enumerate() {
            writeln!(f, "{idx}: {link}")?;
        }
        Ok(())
    }
}
