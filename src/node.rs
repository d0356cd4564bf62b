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

//! Node selectors and their resolution inside a phase.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::LinkError;

/// A time node (or group of nodes) of a phase.
///
/// Only single-node selectors (`Start`, `Mid`, `Penultimate`, `End` and
/// non-negative `Index`) can take part in a multinode link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Node {
    /// First node.
    Start,
    /// Middle node (`n_shooting / 2`).
    Mid,
    /// Every node except the first and the last.
    Intermediates,
    /// Node before the last.
    Penultimate,
    /// Last node (`n_shooting`).
    End,
    /// Every node.
    All,
    /// Every shooting node (all but the last).
    AllShooting,
    /// Node of a phase transition.
    Transition,
    /// Placeholder carried by multinode penalties themselves.
    Multinodes,
    /// Explicit node index.
    Index(i64),
}

impl Node {
    /// Whether the selector designates exactly one node a link can use.
    pub fn is_linkable(&self) -> bool {
        match self {
            Node::Start | Node::Mid | Node::Penultimate | Node::End => true,
            Node::Index(idx) => *idx >= 0,
            _ => false,
        }
    }

    /// Resolves the selector to a node index of a phase with `n_shooting` intervals.
    ///
    /// # Errors
    ///
    /// - [`LinkError::MidNodeParity`] for `Mid` on an odd shooting count.
    /// - [`LinkError::NodeOutOfRange`] when the index does not exist.
    /// - [`LinkError::InvalidNodeSpecifier`] for group selectors.
    pub fn resolve(&self, phase: usize, n_shooting: usize) -> Result<usize, LinkError> {
        match *self {
            Node::Start => Ok(0),
            Node::Mid => {
                if n_shooting % 2 == 1 {
                    return Err(LinkError::MidNodeParity { phase, n_shooting });
                }
                Ok(n_shooting / 2)
            }
            Node::Penultimate => n_shooting.checked_sub(1).ok_or(LinkError::NodeOutOfRange {
                phase,
                node: -1,
                n_shooting,
            }),
            Node::End => Ok(n_shooting),
            Node::Index(idx) => match usize::try_from(idx) {
                Ok(node) if node <= n_shooting => Ok(node),
                _ => Err(LinkError::NodeOutOfRange {
                    phase,
                    node: idx,
                    n_shooting,
                }),
            },
            other => Err(LinkError::InvalidNodeSpecifier {
                position: 0,
                node: other,
            }),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Start => write!(f, "start"),
            Node::Mid => write!(f, "mid"),
            Node::Intermediates => write!(f, "intermediates"),
            Node::Penultimate => write!(f, "penultimate"),
            Node::End => write!(f, "end"),
            Node::All => write!(f, "all"),
            Node::AllShooting => write!(f, "all_shooting"),
            Node::Transition => write!(f, "transition"),
            Node::Multinodes => write!(f, "multinodes"),
            Node::Index(idx) => write!(f, "{idx}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_symbolic_markers() {
        assert_eq!(Node::Start.resolve(0, 10), Ok(0));
        assert_eq!(Node::Mid.resolve(0, 10), Ok(5));
        assert_eq!(Node::Penultimate.resolve(0, 10), Ok(9));
        assert_eq!(Node::End.resolve(0, 10), Ok(10));
        assert_eq!(Node::Index(7).resolve(0, 10), Ok(7));
    }

    #[test]
    fn mid_requires_even_shooting_count() {
        assert_eq!(
            Node::Mid.resolve(2, 9),
            Err(LinkError::MidNodeParity {
                phase: 2,
                n_shooting: 9
            })
        );
    }

    #[test]
    fn index_past_end_is_rejected() {
        assert!(matches!(
            Node::Index(11).resolve(1, 10),
            Err(LinkError::NodeOutOfRange { phase: 1, node: 11, .. })
        ));
        assert!(Node::Index(-1).resolve(1, 10).is_err());
    }

    #[test]
    fn only_single_nodes_are_linkable() {
        assert!(Node::End.is_linkable());
        assert!(Node::Index(0).is_linkable());
        assert!(!Node::Index(-3).is_linkable());
        assert!(!Node::All.is_linkable());
        assert!(!Node::Intermediates.is_linkable());
        assert!(!Node::Multinodes.is_linkable());
    }
}
