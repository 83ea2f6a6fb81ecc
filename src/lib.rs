//! binlift: the IR core of a binary-lifting round-trip harness.
//!
//! A disassembled binary is represented as an [`Ir`] holding ordered
//! [`Module`]s. Each module owns a block graph (code, data and proxy blocks
//! connected by typed control-flow edges), a symbol table and an address
//! space index of sections. IRs can be persisted with [`codec`], concatenated
//! with [`merge`], and inspected with the read-only helpers in [`query`].

/// Core data types module
pub mod core;

pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod merge;
pub mod query;

pub use crate::config::{CodecConfig, CollisionPolicy, IrConfig, LoggingConfig, MergeConfig};
pub use crate::logging::LogFormat;
pub use crate::core::block::{Block, BlockAttrs, BlockKind};
pub use crate::core::edge::{Edge, EdgeLabel, EdgeType};
pub use crate::core::id::{BlockId, EdgeId, GraphTag, ModuleId, SectionId, SymbolId};
pub use crate::core::ir::Ir;
pub use crate::core::module::{Module, ModuleBuilder};
pub use crate::core::section::{Section, SectionFlags};
pub use crate::core::symbol::{Referent, ReferentKind, Symbol};
pub use crate::core::target::{Arch, Endianness, Format};
pub use crate::error::{IrError, Result};
