//! Read-only structural queries used by round-trip validation.
//!
//! These compose the block graph, symbol table and address space index of a
//! single module and hold no state of their own.

use crate::core::block::Block;
use crate::core::block_graph::EdgeIter;
use crate::core::edge::EdgeType;
use crate::core::id::{BlockId, EdgeId, SectionId, SymbolId};
use crate::core::module::Module;
use crate::core::section::Section;
use crate::core::symbol::{ReferentKind, Symbol};
use crate::error::{IrError, Result};

/// Section names that hold PLT stubs across common toolchains.
pub const PLT_SECTION_NAMES: &[&str] = &[".plt", ".plt.got", ".plt.sec", ".iplt"];

/// Whether the symbol resolves to a proxy block.
pub fn is_proxy_referent(module: &Module, symbol: SymbolId) -> Result<bool> {
    Ok(module.referent_kind(symbol)? == ReferentKind::ProxyBlock)
}

/// Outgoing call edges of a block.
pub fn call_edges_from(module: &Module, block: BlockId) -> Result<EdgeIter<'_>> {
    module.blocks().outgoing_edges(block, Some(EdgeType::Call))
}

/// Target blocks of a block's outgoing call edges, in edge order.
pub fn call_targets_from(module: &Module, block: BlockId) -> Result<Vec<(BlockId, &Block)>> {
    let graph = module.blocks();
    call_edges_from(module, block)?
        .map(|(_, edge)| {
            graph
                .block(edge.target)
                .map(|b| (edge.target, b))
                .ok_or(IrError::UnknownBlock(edge.target))
        })
        .collect()
}

/// Sections containing the address of an edge's target block.
///
/// Empty when the target has no address (e.g. a proxy block).
pub fn sections_for_edge_target(module: &Module, edge: EdgeId) -> Result<Vec<(SectionId, &Section)>> {
    let graph = module.blocks();
    let edge = graph.edge(edge).ok_or(IrError::UnknownEdge(edge))?;
    let target = graph
        .block(edge.target)
        .ok_or(IrError::UnknownBlock(edge.target))?;
    Ok(match target.address() {
        Some(address) => module.sections_on(address),
        None => Vec::new(),
    })
}

/// PLT sections containing the target of an edge.
pub fn plt_sections_for_edge(module: &Module, edge: EdgeId) -> Result<Vec<(SectionId, &Section)>> {
    Ok(sections_for_edge_target(module, edge)?
        .into_iter()
        .filter(|(_, s)| PLT_SECTION_NAMES.contains(&s.name.as_str()))
        .collect())
}

/// The only symbol with the given name, or `None` if there are zero or
/// several.
pub fn find_single_symbol<'a>(module: &'a Module, name: &str) -> Option<(SymbolId, &'a Symbol)> {
    let mut hits = module.find_symbols(name);
    let first = hits.next()?;
    match hits.next() {
        Some(_) => None,
        None => Some(first),
    }
}

/// Whether every symbol with this name resolves to a local code block.
///
/// False when the name is absent. A locally defined function must never
/// resolve to a proxy block after disassembly.
pub fn symbol_resolves_to_code(module: &Module, name: &str) -> Result<bool> {
    let mut found = false;
    for (id, _) in module.find_symbols(name) {
        found = true;
        if module.referent_kind(id)? != ReferentKind::CodeBlock {
            return Ok(false);
        }
    }
    Ok(found)
}
