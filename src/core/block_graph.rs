//! BlockGraph: arena of blocks plus the typed control-flow edges between them.
//!
//! Blocks live in an arena keyed by a module-local index; edges and symbols
//! refer to blocks only through [`BlockId`]s. Every id carries the tag of the
//! graph that allocated it, so an edge between two graphs is rejected as
//! [`IrError::CrossModuleEdge`] rather than silently pointing at an unrelated
//! block with the same index.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::core::block::{Block, BlockAttrs, BlockKind};
use crate::core::edge::{Edge, EdgeLabel, EdgeType};
use crate::core::id::{BlockId, EdgeId, GraphTag};
use crate::error::{IrError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockGraph {
    tag: GraphTag,
    next_block: u32,
    next_edge: u32,
    blocks: BTreeMap<u32, Block>,
    edges: BTreeMap<u32, Edge>,
    // Adjacency is derived from `edges` and rebuilt after decoding.
    #[serde(skip)]
    outgoing: HashMap<u32, Vec<EdgeId>>,
    #[serde(skip)]
    incoming: HashMap<u32, Vec<EdgeId>>,
}

impl PartialEq for BlockGraph {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.next_block == other.next_block
            && self.next_edge == other.next_edge
            && self.blocks == other.blocks
            && self.edges == other.edges
    }
}

impl Eq for BlockGraph {}

impl BlockGraph {
    /// Create an empty graph with a fresh tag.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&self) -> GraphTag {
        self.tag
    }

    fn owns(&self, id: BlockId) -> bool {
        id.graph == self.tag
    }

    /// Move the graph to a fresh tag, rewriting every edge endpoint.
    ///
    /// Ids handed out under the old tag stop resolving. Returns the old tag
    /// so the owner can rewrite its own references.
    pub(crate) fn retag(&mut self) -> GraphTag {
        let old = self.tag;
        let mut fresh = GraphTag::new();
        while fresh == old {
            fresh = GraphTag::new();
        }
        self.tag = fresh;
        for edge in self.edges.values_mut() {
            edge.source.graph = fresh;
            edge.target.graph = fresh;
        }
        debug!(old = %old, new = %fresh, "Retagged block graph");
        old
    }

    /// Create a block of the given variant.
    pub fn add_block(&mut self, kind: BlockKind, attrs: BlockAttrs) -> Result<BlockId> {
        let block = Block::from_attrs(kind, attrs)?;
        let index = self.next_block;
        self.next_block = index.checked_add(1).ok_or_else(|| {
            IrError::InvalidBlockAttrs("block id space exhausted".to_string())
        })?;
        self.blocks.insert(index, block);

        let id = BlockId {
            graph: self.tag,
            index,
        };
        debug!(block = %id, kind = %kind, "Added block");
        Ok(id)
    }

    pub fn add_code_block(&mut self, address: u64, size: u64) -> Result<BlockId> {
        self.add_block(BlockKind::Code, BlockAttrs::at(address, size))
    }

    pub fn add_data_block(&mut self, address: u64, size: u64) -> Result<BlockId> {
        self.add_block(BlockKind::Data, BlockAttrs::at(address, size))
    }

    pub fn add_proxy_block(&mut self) -> Result<BlockId> {
        self.add_block(BlockKind::Proxy, BlockAttrs::default())
    }

    /// Connect two blocks of this graph.
    pub fn add_edge(&mut self, source: BlockId, target: BlockId, label: EdgeLabel) -> Result<EdgeId> {
        if !self.owns(source) || !self.owns(target) {
            return Err(IrError::CrossModuleEdge {
                from: source,
                to: target,
            });
        }
        let source_block = self
            .blocks
            .get(&source.index)
            .ok_or(IrError::UnknownBlock(source))?;
        if !self.blocks.contains_key(&target.index) {
            return Err(IrError::UnknownBlock(target));
        }
        if source_block.is_proxy() {
            return Err(IrError::ProxyEdgeSource(source));
        }

        let raw = self.next_edge;
        self.next_edge = raw
            .checked_add(1)
            .ok_or_else(|| IrError::InvalidBlockAttrs("edge id space exhausted".to_string()))?;
        let id = EdgeId(raw);
        self.edges.insert(
            raw,
            Edge {
                source,
                target,
                label,
            },
        );
        self.outgoing.entry(source.index).or_default().push(id);
        self.incoming.entry(target.index).or_default().push(id);

        debug!(edge = %id, %source, %target, kind = %label.kind, "Added edge");
        Ok(id)
    }

    /// Remove an edge and return it.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge> {
        let edge = self.edges.remove(&id.0).ok_or(IrError::UnknownEdge(id))?;
        if let Some(ids) = self.outgoing.get_mut(&edge.source.index) {
            ids.retain(|e| *e != id);
        }
        if let Some(ids) = self.incoming.get_mut(&edge.target.index) {
            ids.retain(|e| *e != id);
        }
        debug!(edge = %id, "Removed edge");
        Ok(edge)
    }

    /// Remove a block that has no incident edges.
    ///
    /// There is no cascading deletion: callers remove the incident edges first.
    pub fn remove_block(&mut self, id: BlockId) -> Result<Block> {
        if !self.contains_block(id) {
            return Err(IrError::UnknownBlock(id));
        }
        let count = self.incident_edge_count(id);
        if count > 0 {
            return Err(IrError::BlockHasEdges { block: id, count });
        }
        self.outgoing.remove(&id.index);
        self.incoming.remove(&id.index);
        let block = self
            .blocks
            .remove(&id.index)
            .ok_or(IrError::UnknownBlock(id))?;
        debug!(block = %id, "Removed block");
        Ok(block)
    }

    /// Assign (or clear) the address of a code or data block.
    pub fn set_block_address(&mut self, id: BlockId, address: Option<u64>) -> Result<()> {
        if !self.owns(id) {
            return Err(IrError::UnknownBlock(id));
        }
        let block = self
            .blocks
            .get_mut(&id.index)
            .ok_or(IrError::UnknownBlock(id))?;
        let mut updated = block.clone();
        match &mut updated {
            Block::Code(b) => b.address = address,
            Block::Data(b) => b.address = address,
            Block::Proxy(_) => {
                return Err(IrError::InvalidBlockAttrs(
                    "proxy blocks cannot have an address".to_string(),
                ))
            }
        }
        updated.validate()?;
        *block = updated;
        Ok(())
    }

    pub fn contains_block(&self, id: BlockId) -> bool {
        self.owns(id) && self.blocks.contains_key(&id.index)
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        if !self.owns(id) {
            return None;
        }
        self.blocks.get(&id.index)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id.0)
    }

    /// All blocks in allocation order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> + Clone + '_ {
        let tag = self.tag;
        self.blocks
            .iter()
            .map(move |(index, block)| (BlockId { graph: tag, index: *index }, block))
    }

    /// All edges in allocation order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + Clone + '_ {
        self.edges.iter().map(|(raw, edge)| (EdgeId(*raw), edge))
    }

    /// Blocks whose bytes contain `address`, in allocation order.
    pub fn blocks_at(&self, address: u64) -> impl Iterator<Item = (BlockId, &Block)> + '_ {
        self.blocks().filter(move |(_, block)| block.contains(address))
    }

    /// Edges sourced at `id`, optionally restricted to one edge type.
    ///
    /// The returned iterator is lazy and can be cloned to restart it.
    pub fn outgoing_edges(&self, id: BlockId, filter: Option<EdgeType>) -> Result<EdgeIter<'_>> {
        if !self.contains_block(id) {
            return Err(IrError::UnknownBlock(id));
        }
        Ok(EdgeIter::new(self, self.outgoing.get(&id.index), filter))
    }

    /// Edges targeting `id`, optionally restricted to one edge type.
    pub fn incoming_edges(&self, id: BlockId, filter: Option<EdgeType>) -> Result<EdgeIter<'_>> {
        if !self.contains_block(id) {
            return Err(IrError::UnknownBlock(id));
        }
        Ok(EdgeIter::new(self, self.incoming.get(&id.index), filter))
    }

    fn incident_edge_count(&self, id: BlockId) -> usize {
        let out = self.outgoing.get(&id.index).map_or(0, Vec::len);
        let inc = self.incoming.get(&id.index).map_or(0, Vec::len);
        // A self-loop is listed on both sides.
        let self_loops = self
            .outgoing
            .get(&id.index)
            .map_or(0, |ids| {
                ids.iter()
                    .filter(|e| self.edges.get(&e.0).is_some_and(|edge| edge.target == id))
                    .count()
            });
        out + inc - self_loops
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Re-check every invariant and rebuild the adjacency indices.
    ///
    /// Used after decoding; the error message describes the first violation.
    pub(crate) fn reindex(&mut self) -> std::result::Result<(), String> {
        self.outgoing.clear();
        self.incoming.clear();

        if let Some((&last, _)) = self.blocks.last_key_value() {
            if last >= self.next_block {
                return Err(format!("block index {} beyond allocator ({})", last, self.next_block));
            }
        }
        if let Some((&last, _)) = self.edges.last_key_value() {
            if last >= self.next_edge {
                return Err(format!("edge index {} beyond allocator ({})", last, self.next_edge));
            }
        }
        for (index, block) in &self.blocks {
            block
                .validate()
                .map_err(|e| format!("block {}: {}", index, e))?;
        }

        for (raw, edge) in &self.edges {
            let id = EdgeId(*raw);
            for endpoint in [edge.source, edge.target] {
                if !self.owns(endpoint) {
                    return Err(format!("{} has an endpoint from another graph", id));
                }
                if !self.blocks.contains_key(&endpoint.index) {
                    return Err(format!("{} refers to missing block {}", id, endpoint));
                }
            }
            if self
                .blocks
                .get(&edge.source.index)
                .is_some_and(Block::is_proxy)
            {
                return Err(format!("{} is sourced at proxy block {}", id, edge.source));
            }
            self.outgoing.entry(edge.source.index).or_default().push(id);
            self.incoming.entry(edge.target.index).or_default().push(id);
        }
        Ok(())
    }
}

/// Lazy, restartable iterator over a block's edges.
#[derive(Debug, Clone)]
pub struct EdgeIter<'a> {
    graph: &'a BlockGraph,
    ids: std::slice::Iter<'a, EdgeId>,
    filter: Option<EdgeType>,
}

impl<'a> EdgeIter<'a> {
    fn new(graph: &'a BlockGraph, ids: Option<&'a Vec<EdgeId>>, filter: Option<EdgeType>) -> Self {
        let ids: &'a [EdgeId] = ids.map(Vec::as_slice).unwrap_or(&[]);
        Self {
            graph,
            ids: ids.iter(),
            filter,
        }
    }
}

impl<'a> Iterator for EdgeIter<'a> {
    type Item = (EdgeId, &'a Edge);

    fn next(&mut self) -> Option<Self::Item> {
        for id in self.ids.by_ref() {
            let Some(edge) = self.graph.edges.get(&id.0) else {
                continue;
            };
            if self.filter.map_or(true, |kind| edge.label.kind == kind) {
                return Some((*id, edge));
            }
        }
        None
    }
}
