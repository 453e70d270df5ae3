//! Boundary representability classification.
//!
//! Pure predicates over the type descriptor tree. A negative answer
//! means "skip the declaration and annotate the output", never a
//! reason to abort the batch; the proxy emitter enforces that policy.

use seam_core::package::is_exported;
use seam_core::types::{NamedForm, Signature, TypeDesc};

/// Whether a single type may cross the boundary.
pub fn is_supported(ty: &TypeDesc) -> bool {
    match ty {
        TypeDesc::Bool
        | TypeDesc::Int { .. }
        | TypeDesc::Float { .. }
        | TypeDesc::Str
        | TypeDesc::Bytes
        | TypeDesc::Error
        | TypeDesc::Ptr(_) => true,
        TypeDesc::Named { underlying, .. } => {
            matches!(underlying, NamedForm::Interface | NamedForm::Pointer)
        }
        TypeDesc::Slice(_)
        | TypeDesc::Map { .. }
        | TypeDesc::Chan(_)
        | TypeDesc::Func(_)
        | TypeDesc::Struct(_) => false,
    }
}

/// Whether every parameter and result of `sig` is representable and
/// the result arity is 0, 1, or 2 with the second result being the
/// error type.
pub fn is_sig_supported(sig: &Signature) -> bool {
    if !sig.params.iter().all(|p| is_supported(&p.ty)) {
        return false;
    }
    match sig.results.as_slice() {
        [] => true,
        [r] => is_supported(r),
        [r, TypeDesc::Error] => is_supported(r),
        _ => false,
    }
}

/// Whether every named type mentioned by `sig` is itself exported.
/// A signature reaching for an unexported type cannot be satisfied
/// from the foreign side.
pub fn sig_uses_exported_types(sig: &Signature) -> bool {
    sig.named_refs().all(|name| is_exported(&name.name))
}

/// Whether the result arity alone satisfies the 0 / 1 / (value, error)
/// rule. Violations are fatal generation errors rather than skips, so
/// the emitter checks this before consulting [`is_sig_supported`].
pub fn has_valid_arity(sig: &Signature) -> bool {
    match sig.results.as_slice() {
        [] | [_] => true,
        [_, second] => *second == TypeDesc::Error,
        _ => false,
    }
}
