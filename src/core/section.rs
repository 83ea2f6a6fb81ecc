//! Section type for named address ranges.
//!
//! Sections correspond to sections in executable formats like ELF and PE.
//! They are owned by a module's address space index.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Permission and layout flags for sections
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SectionFlags: u32 {
        const READABLE = 1;
        const WRITABLE = 1 << 1;
        const EXECUTABLE = 1 << 2;
        const LOADED = 1 << 3;
        const INITIALIZED = 1 << 4;
        const THREAD_LOCAL = 1 << 5;
    }
}

impl SectionFlags {
    /// Flags of a typical loaded code section.
    pub fn code() -> Self {
        Self::READABLE | Self::EXECUTABLE | Self::LOADED | Self::INITIALIZED
    }

    /// Flags of a typical loaded, initialized data section.
    pub fn data() -> Self {
        Self::READABLE | Self::WRITABLE | Self::LOADED | Self::INITIALIZED
    }

    pub fn is_code(&self) -> bool {
        self.contains(Self::READABLE | Self::EXECUTABLE) && !self.contains(Self::WRITABLE)
    }
}

impl fmt::Display for SectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut perms = String::new();
        perms.push(if self.contains(Self::READABLE) { 'r' } else { '-' });
        perms.push(if self.contains(Self::WRITABLE) { 'w' } else { '-' });
        perms.push(if self.contains(Self::EXECUTABLE) { 'x' } else { '-' });
        write!(f, "{}", perms)
    }
}

/// Named, half-open address range `[start, start + size)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Section {
    /// Section name (e.g., ".text", ".plt")
    pub name: String,
    pub start: u64,
    pub size: u64,
    pub flags: SectionFlags,
}

impl Section {
    /// Exclusive end address. Ranges are validated on insertion so this
    /// cannot overflow for sections held by an index.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size)
    }

    /// Check whether `address` falls within this section.
    pub fn contains(&self, address: u64) -> bool {
        address >= self.start && address - self.start < self.size
    }

    pub fn is_executable(&self) -> bool {
        self.flags.contains(SectionFlags::EXECUTABLE)
    }

    pub fn is_writable(&self) -> bool {
        self.flags.contains(SectionFlags::WRITABLE)
    }

    /// Get a human-readable description of the section
    pub fn description(&self) -> String {
        format!(
            "Section '{}' [{:#x}, {:#x}) ({} bytes, perms: {})",
            self.name,
            self.start,
            self.end(),
            self.size,
            self.flags
        )
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Section '{}' @ {:#x}", self.name, self.start)
    }
}
