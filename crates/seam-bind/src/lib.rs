//! Boundary binder for packages exposed across a C-compatible seam.
//!
//! Takes a fully type-resolved package description and produces, per
//! declaration, invocable boundary entry points that marshal values
//! between native and wire form and carry object references as
//! integer handles.
//!
//! ## Modules
//!
//! - [`support`] — Representability classification for types and signatures
//! - [`marshal`] — Type-directed value ↔ wire conversion
//! - [`bridge`] — Handle table, reference bridge, and reverse proxies
//! - [`emit`] — The per-declaration proxy emitter
//! - [`imports`] — Cross-package import collection
//! - [`output`] — The structured bound module and its preamble
//! - [`bindings`] — Native implementations behind the entry points
//! - [`description`] — Description loading, validation, and digests
//! - [`error`] — Fatal generation errors and marshaling faults

pub mod bindings;
pub mod bridge;
pub mod description;
pub mod emit;
pub mod error;
pub mod imports;
pub mod marshal;
pub mod output;
pub mod support;

// Re-export key types for convenience
pub use bindings::{Bindings, NativeFn, VarBinding};
pub use bridge::{ForeignInvoker, HandleTable, NoForeignSide, RefRegistry, ReferenceBridge};
pub use emit::Binder;
pub use error::{BindError, ErrorList, MarshalError, Result};
pub use marshal::{Marshaler, Mode};
pub use output::{BindOutput, BoundModule, EntryPoint, Item, Preamble};
