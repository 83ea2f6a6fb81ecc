//! Ownership and sharing of IR values across threads.

mod common;

use binlift::query::call_edges_from;
use binlift::{codec, Ir, Module};
use common::{ex_binary, has_temp_siblings, plt_library, temp_ir_path};
use std::sync::Arc;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn ir_types_are_send_and_sync() {
    assert_send_sync::<Ir>();
    assert_send_sync::<Module>();
}

#[test]
fn concurrent_readers_see_the_same_structure() {
    let lib = plt_library();
    let bar = lib.bar;
    let ir = Arc::new(lib.ir);

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ir = Arc::clone(&ir);
                s.spawn(move || {
                    let m = &ir.modules()[0];
                    let calls = call_edges_from(m, bar).unwrap().count();
                    let sections = m.sections_on(0x2010).len();
                    (calls, sections)
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), (1, 1));
        }
    });
}

#[test]
fn concurrent_saves_to_one_path_do_not_collide() {
    let ir = Arc::new(ex_binary());
    let (_dir, path) = temp_ir_path("ex.ir");

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ir = Arc::clone(&ir);
                let path = path.clone();
                s.spawn(move || codec::save(&ir, &path))
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }
    });

    assert_eq!(codec::load(&path).unwrap(), *ir);
    assert!(!has_temp_siblings(&path));
}
