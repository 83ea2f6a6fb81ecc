//! Control-flow edges between blocks.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::id::BlockId;

/// Edge type in the block graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    /// Conditional or unconditional branch
    Branch,
    /// Function call (may return)
    Call,
    /// Fallthrough to the next block
    Fallthrough,
    /// Function return
    Return,
    /// System call
    Syscall,
    /// Return from a system call
    Sysret,
}

impl EdgeType {
    pub fn value(&self) -> &str {
        match self {
            EdgeType::Branch => "branch",
            EdgeType::Call => "call",
            EdgeType::Fallthrough => "fallthrough",
            EdgeType::Return => "return",
            EdgeType::Syscall => "syscall",
            EdgeType::Sysret => "sysret",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Label carried by every edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeLabel {
    pub kind: EdgeType,
    /// Taken only when a condition holds
    pub conditional: bool,
    /// Target is encoded in the instruction rather than computed
    pub direct: bool,
}

impl EdgeLabel {
    /// Unconditional, direct edge of the given type.
    pub fn new(kind: EdgeType) -> Self {
        Self {
            kind,
            conditional: false,
            direct: true,
        }
    }

    pub fn conditional(mut self) -> Self {
        self.conditional = true;
        self
    }

    pub fn indirect(mut self) -> Self {
        self.direct = false;
        self
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cond = if self.conditional { "conditional" } else { "unconditional" };
        let direct = if self.direct { "direct" } else { "indirect" };
        write!(f, "{} ({}, {})", self.kind, cond, direct)
    }
}

/// Directed edge between two blocks of the same graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: BlockId,
    pub target: BlockId,
    pub label: EdgeLabel,
}

impl Edge {
    pub fn kind(&self) -> EdgeType {
        self.label.kind
    }

    pub fn is_call(&self) -> bool {
        self.label.kind == EdgeType::Call
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} [{}]", self.source, self.target, self.label)
    }
}
