//! Ir: the top-level container of modules.
//!
//! Module order is meaningful: it reflects load/link order and is preserved
//! by every operation, including the codec and merge.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::core::aux_data::{AuxData, AuxDataTables};
use crate::core::id::ModuleId;
use crate::core::module::Module;
use crate::error::{IrError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ir {
    modules: Vec<Module>,
    aux_data: AuxDataTables,
}

impl Ir {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module; neither its id nor its block graph tag may already
    /// be present.
    pub fn add_module(&mut self, module: Module) -> Result<()> {
        if self.contains_module(module.id()) {
            return Err(IrError::ModuleIdentifierCollision {
                id: module.id(),
                name: module.name().to_string(),
            });
        }
        if self.modules.iter().any(|m| m.graph_tag() == module.graph_tag()) {
            return Err(IrError::GraphTagCollision {
                tag: module.graph_tag(),
                name: module.name().to_string(),
            });
        }
        debug!(module = %module.name(), id = %module.id(), "Added module");
        self.modules.push(module);
        Ok(())
    }

    /// Modules in insertion order.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn contains_module(&self, id: ModuleId) -> bool {
        self.modules.iter().any(|m| m.id() == id)
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| m.id() == id)
    }

    pub fn module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.id() == id)
    }

    /// Modules with the given name; names are not unique.
    pub fn modules_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Module> + 'a {
        self.modules.iter().filter(move |m| m.name() == name)
    }

    /// Remove a module, keeping the order of the rest.
    pub fn remove_module(&mut self, id: ModuleId) -> Result<Module> {
        let pos = self
            .modules
            .iter()
            .position(|m| m.id() == id)
            .ok_or(IrError::UnknownModule(id))?;
        Ok(self.modules.remove(pos))
    }

    pub fn aux_data(&self) -> &AuxDataTables {
        &self.aux_data
    }

    pub fn set_aux_data(&mut self, name: impl Into<String>, table: AuxData) -> Option<AuxData> {
        self.aux_data.insert(name.into(), table)
    }

    pub fn remove_aux_data(&mut self, name: &str) -> Option<AuxData> {
        self.aux_data.remove(name)
    }

    /// BLAKE3 digest over the canonical encoding, as a hex string.
    ///
    /// Structurally equal IRs have equal digests.
    pub fn structural_digest(&self) -> Result<String> {
        let payload = crate::codec::encode_payload(self)?;
        Ok(blake3::hash(&payload).to_hex().to_string())
    }

    pub(crate) fn modules_mut(&mut self) -> &mut Vec<Module> {
        &mut self.modules
    }

    pub(crate) fn aux_data_mut(&mut self) -> &mut AuxDataTables {
        &mut self.aux_data
    }

    /// Re-check every invariant and rebuild derived indices after decoding.
    pub(crate) fn reindex(&mut self) -> std::result::Result<(), String> {
        for (i, module) in self.modules.iter().enumerate() {
            let earlier = &self.modules[..i];
            if earlier.iter().any(|m| m.id() == module.id()) {
                return Err(format!("duplicate module id {}", module.id()));
            }
            if earlier.iter().any(|m| m.graph_tag() == module.graph_tag()) {
                return Err(format!(
                    "module '{}' shares block graph {}",
                    module.name(),
                    module.graph_tag()
                ));
            }
        }
        for module in &mut self.modules {
            module.reindex()?;
        }
        Ok(())
    }
}

impl fmt::Display for Ir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.modules.iter().map(|m| m.name()).collect();
        write!(f, "IR [{}]", names.join(", "))
    }
}
