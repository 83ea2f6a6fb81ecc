//! Symbol table: named references to blocks or raw values.
//!
//! Names are not unique; lookups return every match in insertion order.
//! Block referents are checked against the owning module's block graph when
//! the symbol is bound, never lazily.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

use crate::core::block::BlockKind;
use crate::core::block_graph::BlockGraph;
use crate::core::id::{BlockId, GraphTag, SymbolId};
use crate::error::{IrError, Result};

/// What a symbol refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Referent {
    /// A block of the owning module
    Block(BlockId),
    /// An absolute address not backed by any block
    Address(u64),
    /// A plain value with no address semantics
    Value(i64),
}

impl fmt::Display for Referent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Referent::Block(id) => write!(f, "{}", id),
            Referent::Address(addr) => write!(f, "{:#x}", addr),
            Referent::Value(value) => write!(f, "={}", value),
        }
    }
}

/// Resolved kind of a symbol's referent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferentKind {
    CodeBlock,
    DataBlock,
    ProxyBlock,
    AbsoluteAddress,
    AbsoluteValue,
}

impl From<BlockKind> for ReferentKind {
    fn from(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Code => ReferentKind::CodeBlock,
            BlockKind::Data => ReferentKind::DataBlock,
            BlockKind::Proxy => ReferentKind::ProxyBlock,
        }
    }
}

impl fmt::Display for ReferentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferentKind::CodeBlock => write!(f, "CodeBlock"),
            ReferentKind::DataBlock => write!(f, "DataBlock"),
            ReferentKind::ProxyBlock => write!(f, "ProxyBlock"),
            ReferentKind::AbsoluteAddress => write!(f, "AbsoluteAddress"),
            ReferentKind::AbsoluteValue => write!(f, "AbsoluteValue"),
        }
    }
}

/// Named reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub referent: Referent,
    /// Refers to the end of the referent block rather than its start
    pub at_end: bool,
}

impl Symbol {
    pub fn block(&self) -> Option<BlockId> {
        match self.referent {
            Referent::Block(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.at_end {
            write!(f, "{} -> end of {}", self.name, self.referent)
        } else {
            write!(f, "{} -> {}", self.name, self.referent)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    next_symbol: u32,
    symbols: BTreeMap<u32, Symbol>,
    #[serde(skip)]
    by_name: HashMap<String, Vec<SymbolId>>,
}

impl PartialEq for SymbolTable {
    fn eq(&self, other: &Self) -> bool {
        self.next_symbol == other.next_symbol && self.symbols == other.symbols
    }
}

impl Eq for SymbolTable {}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a symbol, validating a block referent against `graph`.
    pub fn add_symbol(
        &mut self,
        graph: &BlockGraph,
        name: impl Into<String>,
        referent: Referent,
    ) -> Result<SymbolId> {
        self.insert(graph, name.into(), referent, false)
    }

    /// Bind a symbol that refers to the end of its block.
    pub fn add_symbol_at_end(
        &mut self,
        graph: &BlockGraph,
        name: impl Into<String>,
        block: BlockId,
    ) -> Result<SymbolId> {
        self.insert(graph, name.into(), Referent::Block(block), true)
    }

    fn insert(
        &mut self,
        graph: &BlockGraph,
        name: String,
        referent: Referent,
        at_end: bool,
    ) -> Result<SymbolId> {
        if let Referent::Block(block) = referent {
            if !graph.contains_block(block) {
                return Err(IrError::DanglingReferent { name, block });
            }
        }

        let raw = self.next_symbol;
        self.next_symbol = raw.checked_add(1).ok_or_else(|| {
            IrError::InvalidBlockAttrs("symbol id space exhausted".to_string())
        })?;
        let id = SymbolId(raw);
        debug!(symbol = %id, name = %name, referent = %referent, "Added symbol");
        self.by_name.entry(name.clone()).or_default().push(id);
        self.symbols.insert(
            raw,
            Symbol {
                name,
                referent,
                at_end,
            },
        );
        Ok(id)
    }

    pub fn remove_symbol(&mut self, id: SymbolId) -> Result<Symbol> {
        let symbol = self
            .symbols
            .remove(&id.0)
            .ok_or(IrError::UnknownSymbol(id))?;
        if let Some(ids) = self.by_name.get_mut(&symbol.name) {
            ids.retain(|s| *s != id);
            if ids.is_empty() {
                self.by_name.remove(&symbol.name);
            }
        }
        Ok(symbol)
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(&id.0)
    }

    /// All symbols in insertion order.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> + Clone + '_ {
        self.symbols.iter().map(|(raw, sym)| (SymbolId(*raw), sym))
    }

    /// Every symbol with the given name, in insertion order.
    pub fn find_by_name<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = (SymbolId, &'a Symbol)> + Clone + 'a {
        let ids: &'a [SymbolId] = self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[]);
        ids.iter()
            .filter_map(move |id| self.symbols.get(&id.0).map(|sym| (*id, sym)))
    }

    /// Symbols whose referent is `block`.
    pub fn symbols_referring_to(
        &self,
        block: BlockId,
    ) -> impl Iterator<Item = (SymbolId, &Symbol)> + '_ {
        self.symbols()
            .filter(move |(_, sym)| sym.referent == Referent::Block(block))
    }

    /// Classify the referent of a symbol.
    pub fn referent_kind(&self, graph: &BlockGraph, id: SymbolId) -> Result<ReferentKind> {
        let symbol = self.symbol(id).ok_or(IrError::UnknownSymbol(id))?;
        match symbol.referent {
            Referent::Block(block) => graph
                .block(block)
                .map(|b| ReferentKind::from(b.kind()))
                .ok_or_else(|| IrError::DanglingReferent {
                    name: symbol.name.clone(),
                    block,
                }),
            Referent::Address(_) => Ok(ReferentKind::AbsoluteAddress),
            Referent::Value(_) => Ok(ReferentKind::AbsoluteValue),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Rewrite block referents allocated under `old` to `new`.
    pub(crate) fn retag(&mut self, old: GraphTag, new: GraphTag) {
        for symbol in self.symbols.values_mut() {
            if let Referent::Block(block) = &mut symbol.referent {
                if block.graph == old {
                    block.graph = new;
                }
            }
        }
    }

    /// Re-check referents against `graph` and rebuild the name index.
    pub(crate) fn reindex(&mut self, graph: &BlockGraph) -> std::result::Result<(), String> {
        self.by_name.clear();
        if let Some((&last, _)) = self.symbols.last_key_value() {
            if last >= self.next_symbol {
                return Err(format!(
                    "symbol index {} beyond allocator ({})",
                    last, self.next_symbol
                ));
            }
        }
        for (raw, symbol) in &self.symbols {
            if let Referent::Block(block) = symbol.referent {
                if !graph.contains_block(block) {
                    return Err(format!(
                        "symbol '{}' refers to missing block {}",
                        symbol.name, block
                    ));
                }
            }
            self.by_name
                .entry(symbol.name.clone())
                .or_default()
                .push(SymbolId(*raw));
        }
        Ok(())
    }
}
