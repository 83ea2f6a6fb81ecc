//! Module: one compiled unit (executable or library) within an IR.
//!
//! A module exclusively owns its address space index, block graph and symbol
//! table. Mutation goes through the module so that cross-structure
//! invariants (symbol referents, entry point) are checked in one place.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::core::address_space::AddressSpaceIndex;
use crate::core::aux_data::{AuxData, AuxDataTables};
use crate::core::block::{Block, BlockAttrs, BlockKind};
use crate::core::block_graph::BlockGraph;
use crate::core::edge::{Edge, EdgeLabel};
use crate::core::id::{BlockId, EdgeId, GraphTag, ModuleId, SectionId, SymbolId};
use crate::core::section::{Section, SectionFlags};
use crate::core::symbol::{Referent, ReferentKind, Symbol, SymbolTable};
use crate::core::target::{Arch, Endianness, Format};
use crate::error::{IrError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    id: ModuleId,
    name: String,
    binary_path: String,
    isa: Arch,
    byte_order: Endianness,
    file_format: Format,
    preferred_address: u64,
    rebase_delta: i64,
    entry_point: Option<BlockId>,
    sections: AddressSpaceIndex,
    blocks: BlockGraph,
    symbols: SymbolTable,
    aux_data: AuxDataTables,
}

impl Module {
    /// Start building a module with the given name.
    pub fn builder(name: impl Into<String>) -> ModuleBuilder {
        ModuleBuilder::new(name)
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binary_path(&self) -> &str {
        &self.binary_path
    }

    pub fn isa(&self) -> Arch {
        self.isa
    }

    pub fn byte_order(&self) -> Endianness {
        self.byte_order
    }

    pub fn file_format(&self) -> Format {
        self.file_format
    }

    pub fn preferred_address(&self) -> u64 {
        self.preferred_address
    }

    pub fn rebase_delta(&self) -> i64 {
        self.rebase_delta
    }

    /// Address the module is actually loaded at.
    pub fn load_address(&self) -> u64 {
        self.preferred_address.wrapping_add_signed(self.rebase_delta)
    }

    pub fn entry_point(&self) -> Option<BlockId> {
        self.entry_point
    }

    pub fn blocks(&self) -> &BlockGraph {
        &self.blocks
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn sections(&self) -> &AddressSpaceIndex {
        &self.sections
    }

    pub fn aux_data(&self) -> &AuxDataTables {
        &self.aux_data
    }

    /// Tag carried by every block id this module hands out.
    pub fn graph_tag(&self) -> GraphTag {
        self.blocks.tag()
    }

    #[cfg(test)]
    pub(crate) fn set_id(&mut self, id: ModuleId) {
        self.id = id;
    }

    /// Give the module a new id and a fresh block graph tag.
    ///
    /// Every stored block reference (edges, symbol referents, entry point)
    /// is rewritten, so ids issued before the call no longer resolve here.
    pub(crate) fn reassign_identity(&mut self, id: ModuleId) {
        let old = self.blocks.retag();
        let new = self.blocks.tag();
        self.symbols.retag(old, new);
        if let Some(entry) = &mut self.entry_point {
            if entry.graph == old {
                entry.graph = new;
            }
        }
        debug!(module = %self.name, old = %self.id, new = %id, "Reassigned module identity");
        self.id = id;
    }

    // ---- block graph ----

    pub fn add_block(&mut self, kind: BlockKind, attrs: BlockAttrs) -> Result<BlockId> {
        self.blocks.add_block(kind, attrs)
    }

    pub fn add_code_block(&mut self, address: u64, size: u64) -> Result<BlockId> {
        self.blocks.add_code_block(address, size)
    }

    pub fn add_data_block(&mut self, address: u64, size: u64) -> Result<BlockId> {
        self.blocks.add_data_block(address, size)
    }

    pub fn add_proxy_block(&mut self) -> Result<BlockId> {
        self.blocks.add_proxy_block()
    }

    pub fn add_edge(&mut self, source: BlockId, target: BlockId, label: EdgeLabel) -> Result<EdgeId> {
        self.blocks.add_edge(source, target, label)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge> {
        self.blocks.remove_edge(id)
    }

    pub fn set_block_address(&mut self, id: BlockId, address: Option<u64>) -> Result<()> {
        self.blocks.set_block_address(id, address)
    }

    /// Remove a block that has no incident edges and is not named by any
    /// symbol or by the entry point.
    pub fn remove_block(&mut self, id: BlockId) -> Result<Block> {
        if !self.blocks.contains_block(id) {
            return Err(IrError::UnknownBlock(id));
        }
        if self.entry_point == Some(id) {
            return Err(IrError::BlockReferenced {
                block: id,
                by: "the module entry point".to_string(),
            });
        }
        if let Some((_, symbol)) = self.symbols.symbols_referring_to(id).next() {
            return Err(IrError::BlockReferenced {
                block: id,
                by: format!("symbol '{}'", symbol.name),
            });
        }
        self.blocks.remove_block(id)
    }

    /// Set the entry point; it must be a code block of this module.
    pub fn set_entry_point(&mut self, entry: Option<BlockId>) -> Result<()> {
        if let Some(id) = entry {
            let block = self.blocks.block(id).ok_or(IrError::UnknownBlock(id))?;
            if !block.is_code() {
                return Err(IrError::InvalidEntryPoint(id));
            }
        }
        self.entry_point = entry;
        Ok(())
    }

    // ---- symbols ----

    pub fn add_symbol(&mut self, name: impl Into<String>, referent: Referent) -> Result<SymbolId> {
        self.symbols.add_symbol(&self.blocks, name, referent)
    }

    pub fn add_symbol_at_end(&mut self, name: impl Into<String>, block: BlockId) -> Result<SymbolId> {
        self.symbols.add_symbol_at_end(&self.blocks, name, block)
    }

    pub fn remove_symbol(&mut self, id: SymbolId) -> Result<Symbol> {
        self.symbols.remove_symbol(id)
    }

    pub fn find_symbols<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = (SymbolId, &'a Symbol)> + Clone + 'a {
        self.symbols.find_by_name(name)
    }

    pub fn referent_kind(&self, id: SymbolId) -> Result<ReferentKind> {
        self.symbols.referent_kind(&self.blocks, id)
    }

    // ---- sections ----

    pub fn add_section(
        &mut self,
        name: impl Into<String>,
        start: u64,
        size: u64,
        flags: SectionFlags,
    ) -> Result<SectionId> {
        self.sections.add_section(name, start, size, flags)
    }

    pub fn remove_section(&mut self, id: SectionId) -> Option<Section> {
        self.sections.remove_section(id)
    }

    /// Every section containing `address`, in insertion order.
    pub fn sections_on(&self, address: u64) -> Vec<(SectionId, &Section)> {
        self.sections.sections_containing(address)
    }

    // ---- aux data ----

    pub fn set_aux_data(&mut self, name: impl Into<String>, table: AuxData) -> Option<AuxData> {
        self.aux_data.insert(name.into(), table)
    }

    pub fn remove_aux_data(&mut self, name: &str) -> Option<AuxData> {
        self.aux_data.remove(name)
    }

    /// Re-check every invariant and rebuild derived indices after decoding.
    pub(crate) fn reindex(&mut self) -> std::result::Result<(), String> {
        let prefix = |e: String| format!("module '{}': {}", self.name, e);
        self.blocks.reindex().map_err(prefix)?;
        self.symbols.reindex(&self.blocks).map_err(prefix)?;
        self.sections.validate().map_err(prefix)?;
        if let Some(entry) = self.entry_point {
            match self.blocks.block(entry) {
                Some(block) if block.is_code() => {}
                Some(_) => return Err(prefix(format!("entry point {} is not a code block", entry))),
                None => return Err(prefix(format!("entry point {} is missing", entry))),
            }
        }
        debug!(
            module = %self.name,
            blocks = self.blocks.block_count(),
            edges = self.blocks.edge_count(),
            symbols = self.symbols.len(),
            sections = self.sections.len(),
            "Reindexed module"
        );
        Ok(())
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Module '{}' ({}, {}, {})",
            self.name, self.file_format, self.isa, self.byte_order
        )
    }
}

/// Builder for [`Module`]. Metadata is fixed once the module is built.
#[derive(Debug, Clone)]
pub struct ModuleBuilder {
    id: Option<ModuleId>,
    name: String,
    binary_path: Option<String>,
    isa: Arch,
    byte_order: Endianness,
    file_format: Format,
    preferred_address: u64,
    rebase_delta: i64,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            binary_path: None,
            isa: Arch::Unknown,
            byte_order: Endianness::Little,
            file_format: Format::Unknown,
            preferred_address: 0,
            rebase_delta: 0,
        }
    }

    /// Sets an explicit module id (random by default).
    pub fn with_id(mut self, id: ModuleId) -> Self {
        self.id = Some(id);
        self
    }

    /// Derives the module id from the module name.
    pub fn with_derived_id(mut self) -> Self {
        self.id = Some(ModuleId::derived(&self.name));
        self
    }

    pub fn with_binary_path(mut self, path: impl Into<String>) -> Self {
        self.binary_path = Some(path.into());
        self
    }

    pub fn with_isa(mut self, isa: Arch) -> Self {
        self.isa = isa;
        self
    }

    pub fn with_byte_order(mut self, byte_order: Endianness) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_file_format(mut self, file_format: Format) -> Self {
        self.file_format = file_format;
        self
    }

    pub fn with_preferred_address(mut self, address: u64) -> Self {
        self.preferred_address = address;
        self
    }

    pub fn with_rebase_delta(mut self, delta: i64) -> Self {
        self.rebase_delta = delta;
        self
    }

    pub fn build(self) -> Module {
        let binary_path = self.binary_path.unwrap_or_else(|| self.name.clone());
        Module {
            id: self.id.unwrap_or_default(),
            name: self.name,
            binary_path,
            isa: self.isa,
            byte_order: self.byte_order,
            file_format: self.file_format,
            preferred_address: self.preferred_address,
            rebase_delta: self.rebase_delta,
            entry_point: None,
            sections: AddressSpaceIndex::new(),
            blocks: BlockGraph::new(),
            symbols: SymbolTable::new(),
            aux_data: AuxDataTables::new(),
        }
    }
}
