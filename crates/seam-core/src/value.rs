//! Native values and the uniform object surface the glue reaches through.

use std::fmt;
use std::sync::Arc;

use crate::wire::RefHandle;

/// A runtime fault raised while servicing a boundary entry point.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallError {
    #[error("entry expects {expected} wire arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("null receiver handle")]
    NullReceiver,

    #[error("{type_name} has no member {member}")]
    NoSuchMember { type_name: String, member: String },

    #[error("foreign call failed: {message}")]
    Foreign { message: String },

    #[error("marshal fault: {0}")]
    Marshal(String),
}

/// A shared reference to a live native (or reverse-proxied) object.
pub type ObjRef = Arc<dyn BoundObject>;

/// The surface through which generated entry points reach a live
/// object: field access for struct types and dynamic method dispatch
/// for struct and interface types.
///
/// Reverse proxies for foreign-owned objects implement the same trait,
/// so a decoded reference is usable without knowing which side of the
/// boundary owns it.
pub trait BoundObject: Send + Sync {
    /// Qualified type name, e.g. `example/hello.Foo`.
    fn type_name(&self) -> &str;

    /// Read an exported field. `None` if the type has no such field.
    fn get_field(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Write an exported field. `false` if the type has no such field.
    fn set_field(&self, _name: &str, _value: Value) -> bool {
        false
    }

    /// Invoke an exported method. Results are aligned with the declared
    /// result list; a trailing error result is a [`Value::Err`].
    fn call(&self, method: &str, _args: &[Value]) -> Result<Vec<Value>, CallError> {
        Err(CallError::NoSuchMember {
            type_name: self.type_name().to_string(),
            member: method.to_string(),
        })
    }

    /// The foreign handle this object proxies, if it is a reverse
    /// proxy. Encoding such an object must yield this handle back
    /// rather than registering a fresh native one.
    fn foreign_handle(&self) -> Option<RefHandle> {
        None
    }
}

impl std::fmt::Debug for dyn BoundObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundObject")
            .field("type_name", &self.type_name())
            .finish_non_exhaustive()
    }
}

/// Stable identity of a live object: the address of its shared data.
pub fn obj_id(obj: &ObjRef) -> usize {
    Arc::as_ptr(obj) as *const () as usize
}

/// Whether two references denote the same cross-boundary object.
///
/// Reverse proxies compare by the foreign handle they carry, since
/// each decode constructs a fresh proxy for the same handle.
pub fn same_object(a: &ObjRef, b: &ObjRef) -> bool {
    match (a.foreign_handle(), b.foreign_handle()) {
        (Some(ha), Some(hb)) => ha == hb,
        (None, None) => obj_id(a) == obj_id(b),
        _ => false,
    }
}

/// A native value, as seen by the bound package.
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Object reference; `None` is nil.
    Ref(Option<ObjRef>),
    /// Error value; `None` is the nil error.
    Err(Option<String>),
}

impl Value {
    /// Convenience constructor for string values.
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// A non-nil reference to `obj`.
    pub fn object(obj: ObjRef) -> Self {
        Value::Ref(Some(obj))
    }

    /// The nil reference.
    pub fn nil_ref() -> Self {
        Value::Ref(None)
    }

    /// The nil error.
    pub fn nil_err() -> Self {
        Value::Err(None)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Ref(None), Value::Ref(None)) => true,
            (Value::Ref(Some(a)), Value::Ref(Some(b))) => same_object(a, b),
            (Value::Err(a), Value::Err(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::I8(v) => write!(f, "I8({v})"),
            Value::I16(v) => write!(f, "I16({v})"),
            Value::I32(v) => write!(f, "I32({v})"),
            Value::I64(v) => write!(f, "I64({v})"),
            Value::U8(v) => write!(f, "U8({v})"),
            Value::U16(v) => write!(f, "U16({v})"),
            Value::U32(v) => write!(f, "U32({v})"),
            Value::U64(v) => write!(f, "U64({v})"),
            Value::F32(v) => write!(f, "F32({v})"),
            Value::F64(v) => write!(f, "F64({v})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::Bytes(v) => write!(f, "Bytes({} bytes)", v.len()),
            Value::Ref(Some(o)) => write!(f, "Ref({})", o.type_name()),
            Value::Ref(None) => write!(f, "Ref(nil)"),
            Value::Err(Some(msg)) => write!(f, "Err({msg:?})"),
            Value::Err(None) => write!(f, "Err(nil)"),
        }
    }
}
