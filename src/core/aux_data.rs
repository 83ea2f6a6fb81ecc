//! Auxiliary data tables attached to modules or to the whole IR.
//!
//! Tables are opaque byte blobs tagged with a type name chosen by the
//! producing tool (e.g. `"mapping<UUID,string>"`). The core never interprets
//! them; it only stores and persists them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuxData {
    pub type_name: String,
    pub data: Vec<u8>,
}

impl AuxData {
    pub fn new(type_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            type_name: type_name.into(),
            data,
        }
    }

    /// Table holding UTF-8 text.
    pub fn text(text: &str) -> Self {
        Self::new("string", text.as_bytes().to_vec())
    }

    pub fn as_text(&self) -> Option<&str> {
        if self.type_name != "string" {
            return None;
        }
        std::str::from_utf8(&self.data).ok()
    }
}

impl fmt::Display for AuxData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.type_name, self.data.len())
    }
}

/// Named aux data tables, iterated in name order.
pub type AuxDataTables = BTreeMap<String, AuxData>;
