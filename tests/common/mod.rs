//! Shared fixtures for integration tests.
//!
//! The fixtures mirror what a disassembler emits for the small example
//! programs the round-trip harness compiles: an executable `ex`, a shared
//! library `fun.so` it links against, and a library `ex.so` whose functions
//! call each other through the PLT.

#![allow(dead_code)]

use binlift::core::aux_data::AuxData;
use binlift::{
    Arch, BlockAttrs, BlockId, BlockKind, EdgeId, EdgeLabel, EdgeType, Format, Ir, Module,
    Referent, SectionFlags,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Block and edge ids of interest in the `ex.so` fixture.
pub struct PltLibrary {
    pub ir: Ir,
    pub foo: BlockId,
    pub bar: BlockId,
    pub stub: BlockId,
    pub puts: BlockId,
    pub bar_call: EdgeId,
}

fn elf_module(name: &str) -> Module {
    Module::builder(name)
        .with_derived_id()
        .with_isa(Arch::X86_64)
        .with_file_format(Format::ELF)
        .build()
}

fn single(module: Module) -> Ir {
    let mut ir = Ir::new();
    ir.add_module(module).unwrap();
    ir
}

/// Executable `ex`: `main` calls `fun` through the PLT and `fun` lives in
/// `fun.so`, so the stub branches to a proxy block.
///
/// Also carries the less common parts of the model: a rebased module, an
/// unplaced Thumb-mode thunk, an unplaced data block, an end-of-block
/// symbol, a hole in the block arena, a thread-local section and aux data
/// at both levels.
pub fn ex_binary() -> Ir {
    let mut m = Module::builder("ex")
        .with_derived_id()
        .with_isa(Arch::X86_64)
        .with_file_format(Format::ELF)
        .with_preferred_address(0x40_0000)
        .with_rebase_delta(-0x1000)
        .build();
    m.add_section(".plt", 0x1020, 0x20, SectionFlags::code()).unwrap();
    m.add_section(".text", 0x1040, 0x100, SectionFlags::code()).unwrap();
    m.add_section(".data", 0x4000, 0x10, SectionFlags::data()).unwrap();
    m.add_section(
        ".tbss",
        0x5000,
        0x8,
        SectionFlags::READABLE | SectionFlags::WRITABLE | SectionFlags::THREAD_LOCAL,
    )
    .unwrap();

    let stub = m.add_code_block(0x1030, 0x10).unwrap();
    let main = m.add_code_block(0x1040, 0x18).unwrap();
    let scratch = m.add_code_block(0x1060, 0x4).unwrap();
    let after = m.add_code_block(0x1058, 0x8).unwrap();
    let counter = m.add_data_block(0x4000, 0x4).unwrap();
    let fun = m.add_proxy_block().unwrap();
    let thunk = m
        .add_block(BlockKind::Code, BlockAttrs::sized(0x8).with_decode_mode(1))
        .unwrap();
    let tls = m.add_block(BlockKind::Data, BlockAttrs::sized(0x8)).unwrap();
    m.remove_block(scratch).unwrap();

    m.add_edge(main, stub, EdgeLabel::new(EdgeType::Call)).unwrap();
    m.add_edge(main, after, EdgeLabel::new(EdgeType::Fallthrough)).unwrap();
    m.add_edge(stub, fun, EdgeLabel::new(EdgeType::Branch).indirect())
        .unwrap();
    m.add_edge(thunk, main, EdgeLabel::new(EdgeType::Return)).unwrap();

    m.add_symbol("main", Referent::Block(main)).unwrap();
    m.add_symbol_at_end("main_end", main).unwrap();
    m.add_symbol("counter", Referent::Block(counter)).unwrap();
    m.add_symbol("fun", Referent::Block(fun)).unwrap();
    m.add_symbol("__thunk", Referent::Block(thunk)).unwrap();
    m.add_symbol("tls_slot", Referent::Block(tls)).unwrap();
    m.add_symbol("__abi_tag", Referent::Address(0x3f0)).unwrap();
    m.add_symbol("STACK_ADJ", Referent::Value(-16)).unwrap();
    m.set_entry_point(Some(main)).unwrap();
    m.set_aux_data("comments", AuxData::new("map<u64,string>", b"0x1040=main".to_vec()));

    let mut ir = single(m);
    ir.set_aux_data("producer", AuxData::text("ddisasm-like 1.0"));
    ir
}

/// Shared library `fun.so` defining `fun`.
pub fn fun_library() -> Ir {
    let mut m = Module::builder("fun.so")
        .with_derived_id()
        .with_isa(Arch::X86_64)
        .with_file_format(Format::ELF)
        .with_preferred_address(0x7f00_0000_0000)
        .build();
    m.add_section(".text", 0x1100, 0x80, SectionFlags::code()).unwrap();

    let fun = m.add_code_block(0x1100, 0x20).unwrap();
    let ret = m.add_code_block(0x1120, 0x4).unwrap();
    m.add_edge(fun, ret, EdgeLabel::new(EdgeType::Branch).conditional())
        .unwrap();
    m.add_edge(fun, ret, EdgeLabel::new(EdgeType::Fallthrough)).unwrap();
    m.add_symbol("fun", Referent::Block(fun)).unwrap();
    m.add_symbol("FUN_VERSION", Referent::Value(2)).unwrap();
    single(m)
}

/// Library `ex.so`: `bar` calls `foo` through the PLT stub at 0x2010.
pub fn plt_library() -> PltLibrary {
    let mut m = elf_module("ex.so");
    m.add_section(".text", 0x1000, 0x1000, SectionFlags::code()).unwrap();
    m.add_section(".plt", 0x2000, 0x100, SectionFlags::code()).unwrap();
    m.add_section(".got", 0x3000, 0x40, SectionFlags::data()).unwrap();

    let foo = m.add_code_block(0x1000, 0x10).unwrap();
    let bar = m.add_code_block(0x1010, 0x20).unwrap();
    let stub = m.add_code_block(0x2010, 0x10).unwrap();
    let puts = m.add_proxy_block().unwrap();

    let bar_call = m.add_edge(bar, stub, EdgeLabel::new(EdgeType::Call)).unwrap();
    m.add_edge(stub, foo, EdgeLabel::new(EdgeType::Branch).indirect())
        .unwrap();
    m.add_edge(foo, puts, EdgeLabel::new(EdgeType::Call)).unwrap();

    m.add_symbol("foo", Referent::Block(foo)).unwrap();
    m.add_symbol("bar", Referent::Block(bar)).unwrap();
    m.add_symbol("puts", Referent::Block(puts)).unwrap();

    PltLibrary {
        ir: single(m),
        foo,
        bar,
        stub,
        puts,
        bar_call,
    }
}

/// Temporary directory plus a path inside it.
pub fn temp_ir_path(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    (dir, path)
}

/// Whether any stray temp file was left next to `path`.
pub fn has_temp_siblings(path: &Path) -> bool {
    let dir = path.parent().unwrap();
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
}
