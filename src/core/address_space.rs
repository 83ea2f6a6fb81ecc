//! Address space index: which sections contain a given address.
//!
//! Sections are not assumed disjoint. Overlay formats legitimately map
//! several sections over the same bytes, so lookups return every hit in
//! insertion order rather than a single section.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::id::SectionId;
use crate::core::section::{Section, SectionFlags};
use crate::error::{IrError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSpaceIndex {
    next_section: u32,
    sections: BTreeMap<u32, Section>,
}

impl AddressSpaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section covering `[start, start + size)`.
    ///
    /// Identical or overlapping ranges are allowed.
    pub fn add_section(
        &mut self,
        name: impl Into<String>,
        start: u64,
        size: u64,
        flags: SectionFlags,
    ) -> Result<SectionId> {
        let section = Section {
            name: name.into(),
            start,
            size,
            flags,
        };
        validate_section(&section).map_err(IrError::InvalidSection)?;

        let raw = self.next_section;
        self.next_section = raw
            .checked_add(1)
            .ok_or_else(|| IrError::InvalidSection("section id space exhausted".to_string()))?;
        let id = SectionId(raw);
        debug!(section = %id, name = %section.name, start = section.start, size = section.size, "Added section");
        self.sections.insert(raw, section);
        Ok(id)
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(&id.0)
    }

    /// All sections in insertion order.
    pub fn sections(&self) -> impl Iterator<Item = (SectionId, &Section)> + Clone + '_ {
        self.sections.iter().map(|(raw, s)| (SectionId(*raw), s))
    }

    /// Every section containing `address`, in insertion order.
    ///
    /// Returns an empty vector when the address is unmapped.
    pub fn sections_containing(&self, address: u64) -> Vec<(SectionId, &Section)> {
        self.sections()
            .filter(|(_, s)| s.contains(address))
            .collect()
    }

    /// Names of the sections containing `address`, in insertion order.
    pub fn section_names_at(&self, address: u64) -> Vec<&str> {
        self.sections_containing(address)
            .into_iter()
            .map(|(_, s)| s.name.as_str())
            .collect()
    }

    /// Every section with the given name, in insertion order.
    pub fn sections_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (SectionId, &'a Section)> + 'a {
        self.sections().filter(move |(_, s)| s.name == name)
    }

    pub fn remove_section(&mut self, id: SectionId) -> Option<Section> {
        self.sections.remove(&id.0)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if let Some((&last, _)) = self.sections.last_key_value() {
            if last >= self.next_section {
                return Err(format!(
                    "section index {} beyond allocator ({})",
                    last, self.next_section
                ));
            }
        }
        for section in self.sections.values() {
            validate_section(section)?;
        }
        Ok(())
    }
}

fn validate_section(section: &Section) -> std::result::Result<(), String> {
    if section.name.is_empty() {
        return Err("section name cannot be empty".to_string());
    }
    if section.start.checked_add(section.size).is_none() {
        return Err(format!(
            "section '{}' at {:#x} with size {:#x} overflows the address space",
            section.name, section.start, section.size
        ));
    }
    Ok(())
}
