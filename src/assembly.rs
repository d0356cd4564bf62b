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

//! Installation of realized links into the program pools.

use tracing::debug;

use crate::link::LinkCollection;
use crate::program::Program;
use crate::LinkError;

/// Realizes every link of `collection` into its pool slot.
///
/// Links are processed in declaration order. Each link keeps the slot it was
/// given on the first pass, so calling this again rewrites the same slots
/// instead of growing the pools.
///
/// # Errors
///
/// Stops at the first validation or realization failure.
pub fn assemble_links(program: &mut Program, collection: &mut LinkCollection) -> Result<(), LinkError> {
    let links = collection.prepare(program)?;
    for (idx, link) in links.iter_mut().enumerate() {
        let slot = link.ensure_pool_slot(program)?;

        let entry = {
            let mut controllers = link.controllers(program)?;
            let residual = link.realize(&mut controllers)?;
            link.pool_entry(&controllers, residual)?
        };
        let rows = entry.residual().len();
        link.add_to_pool(program, entry)?;

        let (owner, kind) = link.pool_location();
        debug!(
            link = idx,
            function = link.function().name(),
            ?owner,
            ?kind,
            slot,
            rows,
            "installed multinode link"
        );
    }
    Ok(())
}
