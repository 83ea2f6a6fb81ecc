//! Post-disassembly checks on a library that calls local functions through
//! its PLT.

mod common;

use binlift::query::{
    call_edges_from, find_single_symbol, plt_sections_for_edge, sections_for_edge_target,
    symbol_resolves_to_code,
};
use binlift::{codec, EdgeType, ReferentKind};
use common::plt_library;

#[test]
fn locally_defined_symbols_are_code_blocks() {
    let lib = plt_library();
    let ir = codec::decode(&codec::encode(&lib.ir).unwrap()).unwrap();
    let m = &ir.modules()[0];

    let (foo, _) = find_single_symbol(m, "foo").unwrap();
    assert_eq!(m.referent_kind(foo).unwrap(), ReferentKind::CodeBlock);
    assert!(symbol_resolves_to_code(m, "foo").unwrap());
    assert!(symbol_resolves_to_code(m, "bar").unwrap());

    let (puts, _) = find_single_symbol(m, "puts").unwrap();
    assert_eq!(m.referent_kind(puts).unwrap(), ReferentKind::ProxyBlock);
}

#[test]
fn bar_calls_through_the_plt() {
    let lib = plt_library();
    let m = &lib.ir.modules()[0];

    let (_, bar) = find_single_symbol(m, "bar").unwrap();
    let bar_block = bar.block().unwrap();
    assert_eq!(bar_block, lib.bar);

    let (call, edge) = call_edges_from(m, bar_block).unwrap().next().unwrap();
    assert_eq!(edge.kind(), EdgeType::Call);
    let callee = m.blocks().block(edge.target).unwrap();
    assert_eq!(callee.address(), Some(0x2010));

    let plt: Vec<_> = plt_sections_for_edge(m, call)
        .unwrap()
        .into_iter()
        .map(|(_, s)| s.name.clone())
        .collect();
    assert_eq!(plt, vec![".plt".to_string()]);

    let all: Vec<_> = sections_for_edge_target(m, call)
        .unwrap()
        .into_iter()
        .map(|(_, s)| s.name.clone())
        .collect();
    assert_eq!(all, vec![".plt".to_string()]);
}

#[test]
fn proxy_blocks_never_carry_addresses() {
    let lib = plt_library();
    for module in lib.ir.modules() {
        for (_, block) in module.blocks().blocks() {
            if block.is_proxy() {
                assert_eq!(block.address(), None);
                assert_eq!(block.size(), None);
            }
        }
    }
}

#[test]
fn foo_block_resolves_into_text() {
    let lib = plt_library();
    let m = &lib.ir.modules()[0];
    let foo_addr = m.blocks().block(lib.foo).unwrap().address().unwrap();
    assert_eq!(foo_addr, 0x1000);
    assert_eq!(m.sections().section_names_at(foo_addr), vec![".text"]);
}
