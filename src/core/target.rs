//! Target description of a module: file format, ISA and byte order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The executable format of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// Executable and Linkable Format (Linux, Unix)
    ELF,
    /// Portable Executable (Windows)
    PE,
    /// Mach Object file format (macOS, iOS)
    MachO,
    /// Raw binary (no format)
    Raw,
    /// Unknown or unsupported format
    Unknown,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::ELF => write!(f, "ELF"),
            Format::PE => write!(f, "PE"),
            Format::MachO => write!(f, "MachO"),
            Format::Raw => write!(f, "Raw"),
            Format::Unknown => write!(f, "Unknown"),
        }
    }
}

/// The instruction set architecture of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    /// 32-bit x86
    X86,
    /// 64-bit x86
    X86_64,
    /// 32-bit ARM
    ARM,
    /// 64-bit ARM
    AArch64,
    /// MIPS (32-bit)
    MIPS,
    /// MIPS (64-bit)
    MIPS64,
    /// PowerPC (32-bit)
    PPC,
    /// PowerPC (64-bit)
    PPC64,
    /// Unknown or unsupported architecture
    Unknown,
}

impl Arch {
    pub fn is_64_bit(&self) -> bool {
        matches!(
            self,
            Arch::X86_64 | Arch::AArch64 | Arch::MIPS64 | Arch::PPC64
        )
    }

    pub fn bits(&self) -> u8 {
        if self.is_64_bit() {
            64
        } else {
            32
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::ARM => "arm",
            Arch::AArch64 => "aarch64",
            Arch::MIPS => "mips",
            Arch::MIPS64 => "mips64",
            Arch::PPC => "ppc",
            Arch::PPC64 => "ppc64",
            Arch::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// The byte order of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endianness {
    /// Little-endian byte order
    Little,
    /// Big-endian byte order
    Big,
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => write!(f, "Little"),
            Endianness::Big => write!(f, "Big"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_bits() {
        assert_eq!(Arch::X86_64.bits(), 64);
        assert_eq!(Arch::ARM.bits(), 32);
        assert!(!Arch::Unknown.is_64_bit());
    }

    #[test]
    fn test_display() {
        assert_eq!(Format::ELF.to_string(), "ELF");
        assert_eq!(Arch::AArch64.to_string(), "aarch64");
        assert_eq!(Endianness::Big.to_string(), "Big");
    }
}
