//! Binder error types.
//!
//! Two classes of failure exist. Declaration-local unsupported
//! constructs are not errors at all: they become annotations in the
//! output and generation continues. Fatal generation errors are
//! collected into an aggregated list; the affected declaration's
//! remaining output is abandoned while sibling declarations proceed.

use std::fmt;

use seam_core::value::CallError;

/// A fatal generation error, attached to the declaration that raised it.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// Result arity outside 0 / 1 / (value, error).
    #[error("{decl}: functions and methods must return either zero or one value, and optionally an error")]
    BadResultArity { decl: String },

    /// A marshaled type is defined in a package outside the bound set.
    #[error("type {type_name} is defined in {package}, which is not bound")]
    UnboundPackage { type_name: String, package: String },

    /// A type the classifier should have rejected reached marshaling.
    #[error("{decl}: unsupported type {ty} reached marshaling")]
    UnsupportedReached { decl: String, ty: String },

    /// The package description failed validation.
    #[error("invalid package description: {detail}")]
    InvalidDescription { detail: String },

    /// JSON parse error while reading a description.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while reading a description.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for binder operations.
pub type Result<T> = std::result::Result<T, BindError>;

/// The aggregated error list for a whole generation pass.
#[derive(Debug, Default)]
pub struct ErrorList(pub Vec<BindError>);

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}

/// A marshaling fault: a value, wire form, or handle that does not fit
/// the type directing the conversion. The classifier filters input
/// before marshaling, so these are defensive invariant checks.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MarshalError {
    #[error("unsupported type {ty}")]
    Unsupported { ty: String },

    #[error("value does not match type {ty}")]
    ValueMismatch { ty: String },

    #[error("wire form does not match type {ty}")]
    WireMismatch { ty: String },

    #[error("no live object for handle slot {slot}")]
    Dangling { slot: u32 },

    #[error("unknown handle ownership tag {tag}")]
    UnknownOwner { tag: u32 },
}

impl From<MarshalError> for CallError {
    fn from(err: MarshalError) -> Self {
        CallError::Marshal(err.to_string())
    }
}
