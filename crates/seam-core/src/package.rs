//! The bound package description.
//!
//! A fully type-resolved model of the package being exposed across the
//! boundary, produced by an external front-end and consumed read-only
//! for one generation pass. Declaration order and member order are
//! meaningful and preserved through emission.

use serde::{Deserialize, Serialize};

use crate::types::{Signature, TypeDesc};

/// Whether a declared name is exported (leading ASCII uppercase).
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// An exported struct field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeDesc,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Field { name: name.into(), ty }
    }
}

/// A method with its resolved signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub sig: Signature,
}

impl Method {
    pub fn new(name: impl Into<String>, sig: Signature) -> Self {
        Method { name: name.into(), sig }
    }
}

/// An exported struct type: exported fields plus the exported
/// pointer-receiver method set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub methods: Vec<Method>,
}

/// An exported interface type. The method set may contain unexported
/// methods; those make the interface non-implementable from the
/// foreign side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDef {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<Method>,
}

/// An exported free function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncDef {
    pub name: String,
    pub sig: Signature,
}

/// An exported package-level variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDef {
    pub name: String,
    pub ty: TypeDesc,
}

/// The set of declarations being exposed across the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundPackage {
    /// Short package name, used as the entry point prefix.
    pub name: String,
    /// Import path of the package.
    pub path: String,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceDef>,
    #[serde(default)]
    pub funcs: Vec<FuncDef>,
    #[serde(default)]
    pub vars: Vec<VarDef>,
}

impl BoundPackage {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        BoundPackage {
            name: name.into(),
            path: path.into(),
            structs: Vec::new(),
            interfaces: Vec::new(),
            funcs: Vec::new(),
            vars: Vec::new(),
        }
    }
}
