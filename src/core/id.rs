//! Identifier types for IR entities.
//!
//! Module ids are UUIDs and are unique within an IR. Every other id is
//! module-local: it is allocated by the owning block graph, symbol table or
//! address space index and is only meaningful against that owner.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Identifier of a module within an IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(Uuid);

impl ModuleId {
    /// Generate a fresh random module id.
    pub fn new() -> Self {
        ModuleId(Uuid::new_v4())
    }

    /// Derive a stable module id from a name.
    ///
    /// The same name always yields the same id, so two tools processing the
    /// same input independently agree on the identifier.
    pub fn derived(name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"module:");
        hasher.update(name.as_bytes());
        let hash = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash[..16]);
        ModuleId(Uuid::from_bytes(bytes))
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        ModuleId(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ModuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mod:{}", self.0)
    }
}

/// Tag identifying the block graph that allocated a [`BlockId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphTag(Uuid);

impl GraphTag {
    pub fn new() -> Self {
        GraphTag(Uuid::new_v4())
    }
}

impl Default for GraphTag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GraphTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First group is plenty to tell graphs apart in messages.
        let simple = self.0.simple().to_string();
        write!(f, "{}", &simple[..8])
    }
}

/// Identifier of a block, scoped to the graph that allocated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId {
    pub graph: GraphTag,
    pub index: u32,
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blk:{}:{}", self.graph, self.index)
    }
}

macro_rules! local_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

local_id!(
    /// Identifier of an edge within one block graph.
    EdgeId,
    "edge"
);
local_id!(
    /// Identifier of a symbol within one symbol table.
    SymbolId,
    "sym"
);
local_id!(
    /// Identifier of a section within one address space index.
    SectionId,
    "sect"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_module_id_is_stable() {
        assert_eq!(ModuleId::derived("ex"), ModuleId::derived("ex"));
        assert_ne!(ModuleId::derived("ex"), ModuleId::derived("fun.so"));
    }

    #[test]
    fn test_random_module_ids_differ() {
        assert_ne!(ModuleId::new(), ModuleId::new());
    }

    #[test]
    fn test_display() {
        assert_eq!(EdgeId(3).to_string(), "edge:3");
        assert_eq!(SymbolId(0).to_string(), "sym:0");
        assert_eq!(SectionId(7).to_string(), "sect:7");

        let tag = GraphTag::new();
        let id = BlockId {
            graph: tag,
            index: 5,
        };
        let shown = id.to_string();
        assert!(shown.starts_with("blk:"));
        assert!(shown.ends_with(":5"));
        assert_eq!(shown.len(), "blk:".len() + 8 + ":5".len());
    }
}
