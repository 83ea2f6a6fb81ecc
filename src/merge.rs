//! Merge: append the modules of one IR onto another.
//!
//! Merging is structural concatenation, not linking. Blocks, edges, symbols
//! and sections are all module-local, so a module keeps its internal ids
//! unless its identity has to be reassigned. No cross-module edges are
//! created and no symbols are deduplicated.

use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::CollisionPolicy;
use crate::core::id::{GraphTag, ModuleId};
use crate::core::ir::Ir;
use crate::error::{IrError, Result};

/// Append every module of `src` to `dest`, failing on an id collision.
pub fn merge(dest: &mut Ir, src: Ir) -> Result<()> {
    merge_with(dest, src, CollisionPolicy::Fail)
}

/// Append every module of `src` to `dest` under the given collision policy.
///
/// A source module collides when its id or its block graph tag is already
/// taken. Under [`CollisionPolicy::Regenerate`] it gets a fresh id and tag,
/// with its block references rewritten. Collisions are resolved before
/// `dest` is touched, so on error `dest` is unchanged.
pub fn merge_with(dest: &mut Ir, mut src: Ir, policy: CollisionPolicy) -> Result<()> {
    let _span = crate::span_trace!(
        "merge_ir",
        dest_modules = dest.modules().len(),
        src_modules = src.modules().len()
    )
    .entered();

    let mut ids: HashSet<ModuleId> = dest.modules().iter().map(|m| m.id()).collect();
    let mut tags: HashSet<GraphTag> = dest.modules().iter().map(|m| m.graph_tag()).collect();
    let mut reassign = Vec::new();
    for (pos, module) in src.modules().iter().enumerate() {
        let id_taken = ids.contains(&module.id());
        let tag_taken = tags.contains(&module.graph_tag());
        if !id_taken && !tag_taken {
            ids.insert(module.id());
            tags.insert(module.graph_tag());
            continue;
        }
        match policy {
            CollisionPolicy::Fail if id_taken => {
                return Err(crate::log_error!(
                    "merge",
                    IrError::ModuleIdentifierCollision {
                        id: module.id(),
                        name: module.name().to_string(),
                    }
                ));
            }
            CollisionPolicy::Fail => {
                return Err(crate::log_error!(
                    "merge",
                    IrError::GraphTagCollision {
                        tag: module.graph_tag(),
                        name: module.name().to_string(),
                    }
                ));
            }
            CollisionPolicy::Regenerate => {
                let mut fresh = ModuleId::new();
                while !ids.insert(fresh) {
                    fresh = ModuleId::new();
                }
                reassign.push((pos, fresh));
            }
        }
    }

    for (pos, fresh) in reassign {
        let module = &mut src.modules_mut()[pos];
        let old = module.id();
        module.reassign_identity(fresh);
        // A fresh tag is random, but the set must still see it.
        while !tags.insert(module.graph_tag()) {
            module.reassign_identity(fresh);
        }
        warn!(module = %module.name(), %old, new = %fresh, "Reassigned colliding module identity");
    }

    let incoming_aux = std::mem::take(src.aux_data_mut());
    for (name, table) in incoming_aux {
        match dest.aux_data().get(&name) {
            None => {
                dest.set_aux_data(name, table);
            }
            Some(existing) if *existing != table => {
                warn!(table = %name, "Conflicting IR-level aux data; keeping destination table");
            }
            Some(_) => {}
        }
    }

    let appended = src.modules().len();
    dest.modules_mut().append(src.modules_mut());

    info!(
        appended,
        total = dest.modules().len(),
        "Merged IR"
    );
    Ok(())
}
