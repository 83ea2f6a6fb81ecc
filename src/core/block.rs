//! Block types: code, data and proxy blocks.
//!
//! Code and data blocks occupy bytes of the module and may carry an address
//! once one has been assigned. Proxy blocks stand in for targets outside the
//! module (unresolved calls, imported functions) and are never addressable.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IrError, Result};

/// The variant of a block, without its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Code,
    Data,
    Proxy,
}

impl BlockKind {
    pub fn value(&self) -> &str {
        match self {
            BlockKind::Code => "code",
            BlockKind::Data => "data",
            BlockKind::Proxy => "proxy",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Attributes supplied when creating a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockAttrs {
    /// Address, if one has been assigned
    pub address: Option<u64>,
    /// Size in bytes (code/data only, defaults to 0)
    pub size: Option<u64>,
    /// Decode mode for code blocks (e.g. Thumb vs ARM)
    pub decode_mode: u64,
}

impl BlockAttrs {
    /// Attributes of a block at `address` spanning `size` bytes.
    pub fn at(address: u64, size: u64) -> Self {
        Self {
            address: Some(address),
            size: Some(size),
            decode_mode: 0,
        }
    }

    /// Attributes of a block of `size` bytes with no address yet.
    pub fn sized(size: u64) -> Self {
        Self {
            address: None,
            size: Some(size),
            decode_mode: 0,
        }
    }

    pub fn with_decode_mode(mut self, decode_mode: u64) -> Self {
        self.decode_mode = decode_mode;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub address: Option<u64>,
    pub size: u64,
    pub decode_mode: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBlock {
    pub address: Option<u64>,
    pub size: u64,
}

/// Placeholder for a control-flow target outside the module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyBlock;

/// A block owned by a block graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    Code(CodeBlock),
    Data(DataBlock),
    Proxy(ProxyBlock),
}

impl Block {
    /// Build a block of the given kind, validating its attributes.
    pub fn from_attrs(kind: BlockKind, attrs: BlockAttrs) -> Result<Self> {
        let block = match kind {
            BlockKind::Proxy => {
                if attrs.address.is_some() || attrs.size.is_some() {
                    return Err(IrError::InvalidBlockAttrs(
                        "proxy blocks cannot have an address or size".to_string(),
                    ));
                }
                if attrs.decode_mode != 0 {
                    return Err(IrError::InvalidBlockAttrs(
                        "proxy blocks cannot have a decode mode".to_string(),
                    ));
                }
                Block::Proxy(ProxyBlock)
            }
            BlockKind::Code => Block::Code(CodeBlock {
                address: attrs.address,
                size: attrs.size.unwrap_or(0),
                decode_mode: attrs.decode_mode,
            }),
            BlockKind::Data => {
                if attrs.decode_mode != 0 {
                    return Err(IrError::InvalidBlockAttrs(
                        "data blocks cannot have a decode mode".to_string(),
                    ));
                }
                Block::Data(DataBlock {
                    address: attrs.address,
                    size: attrs.size.unwrap_or(0),
                })
            }
        };
        block.validate()?;
        Ok(block)
    }

    /// Check the attribute invariants of this block.
    pub fn validate(&self) -> Result<()> {
        if let (Some(address), Some(size)) = (self.address(), self.size()) {
            if address.checked_add(size).is_none() {
                return Err(IrError::InvalidBlockAttrs(format!(
                    "block at {:#x} with size {:#x} overflows the address space",
                    address, size
                )));
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Code(_) => BlockKind::Code,
            Block::Data(_) => BlockKind::Data,
            Block::Proxy(_) => BlockKind::Proxy,
        }
    }

    /// Address of the block; always `None` for proxy blocks.
    pub fn address(&self) -> Option<u64> {
        match self {
            Block::Code(b) => b.address,
            Block::Data(b) => b.address,
            Block::Proxy(_) => None,
        }
    }

    /// Size of the block; always `None` for proxy blocks.
    pub fn size(&self) -> Option<u64> {
        match self {
            Block::Code(b) => Some(b.size),
            Block::Data(b) => Some(b.size),
            Block::Proxy(_) => None,
        }
    }

    /// Check whether `address` falls inside this block's bytes.
    pub fn contains(&self, address: u64) -> bool {
        match (self.address(), self.size()) {
            (Some(start), Some(size)) => address >= start && address - start < size,
            _ => false,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Block::Code(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Block::Data(_))
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, Block::Proxy(_))
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.address(), self.size()) {
            (Some(addr), Some(size)) => write!(f, "{} block @ {:#x} ({} bytes)", self.kind(), addr, size),
            (None, Some(size)) => write!(f, "{} block ({} bytes)", self.kind(), size),
            _ => write!(f, "{} block", self.kind()),
        }
    }
}
