//! Error types for the binlift IR core.
//!
//! Every mutating operation validates its invariant eagerly and reports
//! failure through [`IrError`]. A failed call never leaves the IR partially
//! mutated.

use thiserror::Error;

use crate::core::id::{BlockId, EdgeId, GraphTag, ModuleId, SymbolId};

/// Main error type for IR operations.
#[derive(Debug, Error)]
pub enum IrError {
    /// Block attributes do not fit the block variant
    #[error("Invalid block attributes: {0}")]
    InvalidBlockAttrs(String),

    /// Block id is not present in the graph
    #[error("Unknown block: {0}")]
    UnknownBlock(BlockId),

    /// Edge endpoints were allocated by different block graphs
    #[error("Edge {from} -> {to} crosses a module boundary")]
    CrossModuleEdge { from: BlockId, to: BlockId },

    /// Block still has incident edges
    #[error("Block {block} still has {count} incident edge(s)")]
    BlockHasEdges { block: BlockId, count: usize },

    /// Symbol referent names a block that is not in the module
    #[error("Symbol '{name}' refers to block {block} which is not in this module")]
    DanglingReferent { name: String, block: BlockId },

    /// Module id already present in the destination IR
    #[error("Module '{name}' ({id}) collides with an existing module")]
    ModuleIdentifierCollision { id: ModuleId, name: String },

    /// Module's block graph shares its tag with another module in the IR
    #[error("Module '{name}' shares block graph {tag} with an existing module")]
    GraphTagCollision { tag: GraphTag, name: String },

    /// Persisted bytes are malformed
    #[error("Corrupt encoding: {0}")]
    CorruptEncoding(String),

    /// Persisted format is newer than this codec
    #[error("Unsupported format version {found} (newest supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Edge id is not present in the graph
    #[error("Unknown edge: {0}")]
    UnknownEdge(EdgeId),

    /// Symbol id is not present in the table
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(SymbolId),

    /// Module id is not present in the IR
    #[error("Unknown module: {0}")]
    UnknownModule(ModuleId),

    /// Proxy blocks only ever receive edges
    #[error("Proxy block {0} cannot be the source of an edge")]
    ProxyEdgeSource(BlockId),

    /// Block is still named by a symbol or the entry point
    #[error("Block {block} is still referenced by {by}")]
    BlockReferenced { block: BlockId, by: String },

    /// Entry point must be a code block
    #[error("Entry point {0} is not a code block")]
    InvalidEntryPoint(BlockId),

    /// Section name or range is malformed
    #[error("Invalid section: {0}")]
    InvalidSection(String),

    /// Persisted file exceeds the configured size limit
    #[error("File size of {found} bytes exceeds the maximum allowed size of {limit} bytes")]
    FileTooLarge { limit: u64, found: u64 },

    /// Serialization errors while encoding
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IrError {
    /// Whether the caller can fix the situation locally and retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IrError::ModuleIdentifierCollision { .. }
                | IrError::GraphTagCollision { .. }
                | IrError::BlockHasEdges { .. }
        )
    }
}

/// Result type alias for IR operations
pub type Result<T> = std::result::Result<T, IrError>;
