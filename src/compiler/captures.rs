//! Free-variable resolution across nested lambda frames.
//!
//! A reference resolves to one of three places: a local binding in the
//! current frame, a slot in the current frame's capture record, or the
//! referenced symbol's global cell. Resolution is transitive: when an
//! inner lambda references a variable local to an outer lambda, every
//! intermediate frame gains a capture entry for it, so each closure can
//! hand the value down to the next at materialization time.
//!
//! Results are memoized in each frame's capture table, so a symbol
//! resolved twice gets the same index and the record is never widened
//! for a repeat reference.

use cranelift_codegen::ir::StackSlot;

use crate::value::repr::Value;

use super::scope::ScopeStack;

/// Where a variable reference loads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// Bound in the current frame; load from its binding slot.
    Local(StackSlot),
    /// Free in the current frame; load from the capture record at this
    /// dense index.
    Capture(usize),
    /// Not lexically bound anywhere; load from the symbol's global cell.
    Global,
}

/// Resolve `sym` as seen from `frame`.
pub(crate) fn resolve(scopes: &mut ScopeStack, frame: usize, sym: Value) -> Resolution {
    if let Some(slot) = scopes.frame(frame).lookup_local(sym) {
        return Resolution::Local(slot);
    }
    if let Some(idx) = scopes.frame(frame).lookup_capture(sym) {
        return Resolution::Capture(idx);
    }
    let parent = match scopes.frame(frame).parent {
        Some(p) => p,
        None => return Resolution::Global,
    };
    match resolve(scopes, parent, sym) {
        Resolution::Global => Resolution::Global,
        // Local or already-captured in the parent: either way the parent
        // can supply the value, so claim the next index here.
        Resolution::Local(_) | Resolution::Capture(_) => {
            Resolution::Capture(scopes.frame_mut(frame).add_capture(sym))
        }
    }
}
