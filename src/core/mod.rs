//! Core data types of the IR.
//!
//! Leaves first: ids, blocks and edges, then the per-module structures
//! (block graph, symbol table, address space index), the module that owns
//! them and finally the IR container.

pub mod address_space;
pub mod aux_data;
pub mod block;
pub mod block_graph;
pub mod edge;
pub mod id;
pub mod ir;
pub mod module;
pub mod section;
pub mod symbol;
pub mod target;
