//! Two independently disassembled units merged into one IR.

mod common;

use binlift::merge::{merge, merge_with};
use binlift::{codec, CollisionPolicy, EdgeLabel, EdgeType, IrError, Referent};
use common::{ex_binary, fun_library, temp_ir_path};

#[test]
fn binary_and_library_merge_into_two_modules() {
    let (_dir, ex_path) = temp_ir_path("ex.ir");
    let lib_path = ex_path.with_file_name("fun.so.ir");
    codec::save(&ex_binary(), &ex_path).unwrap();
    codec::save(&fun_library(), &lib_path).unwrap();

    let mut ir = codec::load(&ex_path).unwrap();
    let library = codec::load(&lib_path).unwrap();
    let ex_before = ir.modules()[0].clone();
    let lib_before = library.modules()[0].clone();

    merge(&mut ir, library).unwrap();

    assert_eq!(ir.modules().len(), 2);
    assert_eq!(ir.modules()[0].name(), "ex");
    assert_eq!(ir.modules()[1].name(), "fun.so");
    assert_eq!(ir.modules()[0], ex_before);
    assert_eq!(ir.modules()[1], lib_before);

    // The merged IR is what the printer consumes.
    let merged_path = ex_path.with_file_name("two_modules.ir");
    codec::save(&ir, &merged_path).unwrap();
    let reloaded = codec::load(&merged_path).unwrap();
    assert_eq!(reloaded, ir);
}

#[test]
fn merge_does_not_link_symbols() {
    let mut ir = ex_binary();
    merge(&mut ir, fun_library()).unwrap();

    let ex = &ir.modules()[0];
    let lib = &ir.modules()[1];
    let (ex_fun, _) = ex.find_symbols("fun").next().unwrap();
    let (lib_fun, _) = lib.find_symbols("fun").next().unwrap();

    // Still a proxy in `ex`; resolving it is the printer's job.
    assert!(binlift::query::is_proxy_referent(ex, ex_fun).unwrap());
    assert!(!binlift::query::is_proxy_referent(lib, lib_fun).unwrap());
}

#[test]
fn merging_module_with_same_identifier_fails() {
    let mut dest = ex_binary();
    let before = dest.clone();

    let err = merge(&mut dest, ex_binary()).unwrap_err();
    assert!(matches!(err, IrError::ModuleIdentifierCollision { ref name, .. } if name == "ex"));
    assert!(err.is_recoverable());
    assert_eq!(dest, before);
}

#[test]
fn collision_can_be_resolved_by_regenerating_ids() {
    let mut dest = ex_binary();
    merge_with(&mut dest, ex_binary(), CollisionPolicy::Regenerate).unwrap();

    assert_eq!(dest.modules().len(), 2);
    assert_ne!(dest.modules()[0].id(), dest.modules()[1].id());
    assert_eq!(dest.modules_named("ex").count(), 2);

    // Both copies remain valid and persist.
    let back = codec::decode(&codec::encode(&dest).unwrap()).unwrap();
    assert_eq!(back, dest);
}

#[test]
fn same_file_loaded_twice_keeps_block_ids_apart() {
    let (_dir, path) = temp_ir_path("ex.ir");
    codec::save(&ex_binary(), &path).unwrap();

    let mut dest = codec::load(&path).unwrap();
    let again = codec::load(&path).unwrap();
    assert_eq!(
        dest.modules()[0].graph_tag(),
        again.modules()[0].graph_tag()
    );

    let err = merge(&mut dest, again.clone()).unwrap_err();
    assert!(matches!(err, IrError::ModuleIdentifierCollision { .. }));
    merge_with(&mut dest, again, CollisionPolicy::Regenerate).unwrap();

    let first = &dest.modules()[0];
    let main0 = first.entry_point().unwrap();
    let copy_id = dest.modules()[1].id();
    assert_ne!(dest.modules()[1].graph_tag(), first.graph_tag());

    let copy = dest.module_mut(copy_id).unwrap();
    let main1 = copy.entry_point().unwrap();
    assert_eq!(main1.index, main0.index);
    assert_ne!(main1, main0);

    assert!(matches!(
        copy.add_symbol("foreign", Referent::Block(main0)),
        Err(IrError::DanglingReferent { .. })
    ));
    assert!(matches!(
        copy.add_edge(main0, main1, EdgeLabel::new(EdgeType::Call)),
        Err(IrError::CrossModuleEdge { .. })
    ));

    // The copy's own references were carried over to its new tag.
    let calls = binlift::query::call_edges_from(copy, main1).unwrap().count();
    assert_eq!(calls, 1);
    assert!(binlift::query::symbol_resolves_to_code(copy, "main").unwrap());

    let back = codec::decode(&codec::encode(&dest).unwrap()).unwrap();
    assert_eq!(back, dest);
}
