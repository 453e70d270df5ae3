//! Core data model for the seam boundary binder.
//!
//! Holds the immutable inputs and runtime currencies shared by the
//! binder and its generated entry points:
//!
//! - [`types`] — the closed type descriptor tree and signatures
//! - [`package`] — the bound package description
//! - [`value`] — native values and the [`value::BoundObject`] surface
//! - [`wire`] — wire representations, buffers, and reference handles

pub mod package;
pub mod types;
pub mod value;
pub mod wire;

pub use package::{BoundPackage, Field, FuncDef, InterfaceDef, Method, StructDef, VarDef};
pub use types::{FloatPrecision, IntWidth, NamedForm, Param, Signature, Signedness, TypeDesc, TypeName};
pub use value::{BoundObject, CallError, ObjRef, Value};
pub use wire::{RefHandle, RefOwner, Wire, WireBuf, WireType};
