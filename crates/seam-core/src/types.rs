//! The boundary type universe.
//!
//! A closed descriptor tree covering every type a bound package may
//! mention. Only a subset of it is representable on the wire; the
//! remaining variants exist so the classifier can be a total function
//! over pre-resolved input instead of probing a live type system.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wire::WireType;

/// Signedness of an integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// Integer width in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

/// IEEE 754 floating-point precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatPrecision {
    F32,
    F64,
}

/// The underlying form of a named type.
///
/// Only interface and pointer underlyings may cross the boundary;
/// the other forms are carried so they can be classified and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedForm {
    Interface,
    Pointer,
    Struct,
    Basic,
}

/// A named type together with its defining package path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeName {
    /// Import path of the defining package.
    pub package: String,
    /// Exported name within that package.
    pub name: String,
}

impl TypeName {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        TypeName {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Package-qualified name, e.g. `example/hello.Greeter`.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

/// A fully resolved type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDesc {
    Bool,
    Int {
        width: IntWidth,
        signedness: Signedness,
    },
    Float {
        precision: FloatPrecision,
    },
    /// Host string.
    Str,
    /// Byte sequence ([]byte in the host package).
    Bytes,
    /// The host error type. Crosses the boundary as a message string.
    Error,
    /// Pointer to a named struct type.
    Ptr(TypeName),
    /// Named type whose underlying form decides representability.
    Named {
        name: TypeName,
        underlying: NamedForm,
    },
    /// Non-byte sequence. Never representable.
    Slice(Box<TypeDesc>),
    /// Map. Never representable.
    Map {
        key: Box<TypeDesc>,
        value: Box<TypeDesc>,
    },
    /// Channel. Never representable.
    Chan(Box<TypeDesc>),
    /// Function value. Never representable.
    Func(Box<Signature>),
    /// Value (non-pointer) struct. Never representable as a parameter.
    Struct(TypeName),
}

impl TypeDesc {
    pub fn i8() -> Self {
        TypeDesc::Int { width: IntWidth::W8, signedness: Signedness::Signed }
    }
    pub fn i16() -> Self {
        TypeDesc::Int { width: IntWidth::W16, signedness: Signedness::Signed }
    }
    pub fn i32() -> Self {
        TypeDesc::Int { width: IntWidth::W32, signedness: Signedness::Signed }
    }
    pub fn i64() -> Self {
        TypeDesc::Int { width: IntWidth::W64, signedness: Signedness::Signed }
    }
    pub fn u8() -> Self {
        TypeDesc::Int { width: IntWidth::W8, signedness: Signedness::Unsigned }
    }
    pub fn u16() -> Self {
        TypeDesc::Int { width: IntWidth::W16, signedness: Signedness::Unsigned }
    }
    pub fn u32() -> Self {
        TypeDesc::Int { width: IntWidth::W32, signedness: Signedness::Unsigned }
    }
    pub fn u64() -> Self {
        TypeDesc::Int { width: IntWidth::W64, signedness: Signedness::Unsigned }
    }
    pub fn f32() -> Self {
        TypeDesc::Float { precision: FloatPrecision::F32 }
    }
    pub fn f64() -> Self {
        TypeDesc::Float { precision: FloatPrecision::F64 }
    }

    /// Pointer to the named struct `name` defined in `package`.
    pub fn ptr_to(package: &str, name: &str) -> Self {
        TypeDesc::Ptr(TypeName::new(package, name))
    }

    /// Named interface type.
    pub fn interface(package: &str, name: &str) -> Self {
        TypeDesc::Named {
            name: TypeName::new(package, name),
            underlying: NamedForm::Interface,
        }
    }

    /// The named type this descriptor refers to, if any.
    pub fn named_ref(&self) -> Option<&TypeName> {
        match self {
            TypeDesc::Ptr(n) | TypeDesc::Struct(n) => Some(n),
            TypeDesc::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The wire representation of this type, for representable types.
    pub fn wire_type(&self) -> Option<WireType> {
        match self {
            TypeDesc::Bool => Some(WireType::I8),
            TypeDesc::Int { width, signedness } => Some(match (width, signedness) {
                (IntWidth::W8, Signedness::Signed) => WireType::I8,
                (IntWidth::W16, Signedness::Signed) => WireType::I16,
                (IntWidth::W32, Signedness::Signed) => WireType::I32,
                (IntWidth::W64, Signedness::Signed) => WireType::I64,
                (IntWidth::W8, Signedness::Unsigned) => WireType::U8,
                (IntWidth::W16, Signedness::Unsigned) => WireType::U16,
                (IntWidth::W32, Signedness::Unsigned) => WireType::U32,
                (IntWidth::W64, Signedness::Unsigned) => WireType::U64,
            }),
            TypeDesc::Float { precision } => Some(match precision {
                FloatPrecision::F32 => WireType::F32,
                FloatPrecision::F64 => WireType::F64,
            }),
            TypeDesc::Str | TypeDesc::Bytes | TypeDesc::Error => Some(WireType::Buf),
            TypeDesc::Ptr(_) => Some(WireType::Handle),
            TypeDesc::Named { underlying, .. } => match underlying {
                NamedForm::Interface | NamedForm::Pointer => Some(WireType::Handle),
                NamedForm::Struct | NamedForm::Basic => None,
            },
            TypeDesc::Slice(_)
            | TypeDesc::Map { .. }
            | TypeDesc::Chan(_)
            | TypeDesc::Func(_)
            | TypeDesc::Struct(_) => None,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Bool => write!(f, "bool"),
            TypeDesc::Int { width, signedness } => {
                let prefix = match signedness {
                    Signedness::Signed => "int",
                    Signedness::Unsigned => "uint",
                };
                let bits = match width {
                    IntWidth::W8 => 8,
                    IntWidth::W16 => 16,
                    IntWidth::W32 => 32,
                    IntWidth::W64 => 64,
                };
                write!(f, "{prefix}{bits}")
            }
            TypeDesc::Float { precision } => match precision {
                FloatPrecision::F32 => write!(f, "float32"),
                FloatPrecision::F64 => write!(f, "float64"),
            },
            TypeDesc::Str => write!(f, "string"),
            TypeDesc::Bytes => write!(f, "[]byte"),
            TypeDesc::Error => write!(f, "error"),
            TypeDesc::Ptr(n) => write!(f, "*{n}"),
            TypeDesc::Named { name, .. } => write!(f, "{name}"),
            TypeDesc::Slice(e) => write!(f, "[]{e}"),
            TypeDesc::Map { key, value } => write!(f, "map[{key}]{value}"),
            TypeDesc::Chan(e) => write!(f, "chan {e}"),
            TypeDesc::Func(_) => write!(f, "func"),
            TypeDesc::Struct(n) => write!(f, "{n}"),
        }
    }
}

/// A named function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeDesc,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Param { name: name.into(), ty }
    }
}

/// An ordered function signature.
///
/// Result arity is constrained to 0, 1, or 2 with the second result
/// being `Error`; the constraint is enforced by the binder, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub results: Vec<TypeDesc>,
}

impl Signature {
    pub fn new(params: Vec<Param>, results: Vec<TypeDesc>) -> Self {
        Signature { params, results }
    }

    /// Every named type mentioned by a parameter or result.
    pub fn named_refs(&self) -> impl Iterator<Item = &TypeName> {
        self.params
            .iter()
            .map(|p| &p.ty)
            .chain(self.results.iter())
            .filter_map(TypeDesc::named_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_types_of_scalars() {
        assert_eq!(TypeDesc::Bool.wire_type(), Some(WireType::I8));
        assert_eq!(TypeDesc::i32().wire_type(), Some(WireType::I32));
        assert_eq!(TypeDesc::u64().wire_type(), Some(WireType::U64));
        assert_eq!(TypeDesc::f32().wire_type(), Some(WireType::F32));
        assert_eq!(TypeDesc::Str.wire_type(), Some(WireType::Buf));
        assert_eq!(TypeDesc::Error.wire_type(), Some(WireType::Buf));
    }

    #[test]
    fn wire_types_of_references() {
        assert_eq!(
            TypeDesc::ptr_to("example/hello", "Foo").wire_type(),
            Some(WireType::Handle)
        );
        assert_eq!(
            TypeDesc::interface("example/hello", "Greeter").wire_type(),
            Some(WireType::Handle)
        );
    }

    #[test]
    fn unrepresentable_types_have_no_wire_form() {
        assert_eq!(TypeDesc::Slice(Box::new(TypeDesc::i32())).wire_type(), None);
        assert_eq!(
            TypeDesc::Map {
                key: Box::new(TypeDesc::Str),
                value: Box::new(TypeDesc::i64()),
            }
            .wire_type(),
            None
        );
        assert_eq!(
            TypeDesc::Named {
                name: TypeName::new("p", "Weekday"),
                underlying: NamedForm::Basic,
            }
            .wire_type(),
            None
        );
    }

    #[test]
    fn display_forms() {
        assert_eq!(TypeDesc::i32().to_string(), "int32");
        assert_eq!(TypeDesc::u8().to_string(), "uint8");
        assert_eq!(TypeDesc::Bytes.to_string(), "[]byte");
        assert_eq!(TypeDesc::ptr_to("p", "Foo").to_string(), "*p.Foo");
        assert_eq!(
            TypeDesc::Chan(Box::new(TypeDesc::Str)).to_string(),
            "chan string"
        );
    }

    #[test]
    fn named_refs_of_signature() {
        let sig = Signature::new(
            vec![
                Param::new("f", TypeDesc::ptr_to("example/hello", "Foo")),
                Param::new("n", TypeDesc::i32()),
            ],
            vec![TypeDesc::interface("example/hello", "Greeter")],
        );
        let refs: Vec<_> = sig.named_refs().map(|n| n.name.as_str()).collect();
        assert_eq!(refs, ["Foo", "Greeter"]);
    }
}
