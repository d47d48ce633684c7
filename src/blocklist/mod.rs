//! Append-only arena of block descriptors in file order.
//!
//! On disk each block records the offset of its successor.  The list mirrors
//! that chain lazily: a node is created only when a traversal steps past the
//! last existing node, and it is positioned at the offset its predecessor's
//! decoded header recorded.  Nodes are never removed or reordered.
//!
//! Traversal state lives in a [`BlockCursor`] owned by the caller, so two
//! traversals of the same list cannot disturb each other.

use tracing::trace;

use crate::block::Block;
use crate::error::{Result, SdfError};

/// Position of a traversal over a [`BlockList`].  `None` means "before the
/// head".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCursor {
    current: Option<usize>,
}

impl BlockCursor {
    pub fn new() -> Self { Self::default() }

    pub fn current(&self) -> Option<usize> { self.current }

    pub fn reset(&mut self) { self.current = None; }
}

#[derive(Debug, Default)]
pub struct BlockList {
    nodes: Vec<Block>,
}

impl BlockList {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn get(&self, index: usize) -> Option<&Block> { self.nodes.get(index) }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Block> { self.nodes.get_mut(index) }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> { self.nodes.iter() }

    pub fn find(&self, id: &str) -> Option<&Block> {
        self.nodes.iter().find(|b| b.state.header_done() && b.id == id)
    }

    /// Index [`advance`](Self::advance) would move `cursor` to, if that node
    /// already exists.  `None` means the next step would create a node.
    pub fn peek(&self, cursor: &BlockCursor) -> Option<usize> {
        let next = cursor.current.map_or(0, |i| i + 1);
        (next < self.nodes.len()).then_some(next)
    }

    /// Step `cursor` to the next node, creating it if needed.
    ///
    /// * empty list: create the head at `summary_location`;
    /// * cursor before the head: move to the head;
    /// * successor exists: move to it;
    /// * otherwise create a node at the current node's next-block offset.
    ///
    /// Creating a successor requires the current node's header to be decoded
    /// (its next-block offset is meaningless before that) and is refused once
    /// the list already holds `nblocks` nodes.
    pub fn advance(&mut self, cursor: &mut BlockCursor, summary_location: u64, nblocks: u32) -> Result<usize> {
        let next = match cursor.current {
            _ if self.nodes.is_empty() => {
                if nblocks == 0 {
                    return Err(SdfError::BlockCountExceeded { nblocks });
                }
                self.nodes.push(Block::pending(summary_location));
                0
            }
            None => 0,
            Some(i) if i + 1 < self.nodes.len() => i + 1,
            Some(i) => {
                let prev = &self.nodes[i];
                if !prev.state.header_done() {
                    return Err(SdfError::NotReady("SDF block header has not been read"));
                }
                if self.nodes.len() >= nblocks as usize {
                    return Err(SdfError::BlockCountExceeded { nblocks });
                }
                let start = prev.next_block_location;
                self.nodes.push(Block::pending(start));
                i + 1
            }
        };
        trace!(index = next, start = self.nodes[next].block_start, "advance");
        cursor.current = Some(next);
        Ok(next)
    }
}
