//! Cross-package import collection.
//!
//! Emission touches every named type it marshals; the collector
//! accumulates the referenced package paths so the preamble can be
//! rendered once, after the body, and still be placed first. A
//! reference to a package outside the bound set is a fatal generation
//! error.

use std::collections::BTreeSet;

use seam_core::types::{Signature, TypeDesc, TypeName};

use crate::error::BindError;

/// Accumulates the packages referenced by emitted code.
#[derive(Debug)]
pub struct ImportCollector {
    home: String,
    bound: BTreeSet<String>,
    seen: BTreeSet<String>,
}

impl ImportCollector {
    /// `home` is the package being emitted; references into it are
    /// legal but never collected.
    pub fn new(home: impl Into<String>, bound: impl IntoIterator<Item = String>) -> Self {
        ImportCollector {
            home: home.into(),
            bound: bound.into_iter().collect(),
            seen: BTreeSet::new(),
        }
    }

    /// Record a reference to `name`'s defining package.
    pub fn touch(&mut self, name: &TypeName) -> Result<(), BindError> {
        if name.package == self.home {
            return Ok(());
        }
        if !self.bound.contains(&name.package) {
            return Err(BindError::UnboundPackage {
                type_name: name.qualified(),
                package: name.package.clone(),
            });
        }
        self.seen.insert(name.package.clone());
        Ok(())
    }

    /// Record the named type referenced by `ty`, if any.
    pub fn touch_type(&mut self, ty: &TypeDesc) -> Result<(), BindError> {
        if let Some(name) = ty.named_ref() {
            self.touch(name)?;
        }
        Ok(())
    }

    /// Record every named type referenced by `sig`.
    pub fn touch_sig(&mut self, sig: &Signature) -> Result<(), BindError> {
        for name in sig.named_refs() {
            self.touch(name)?;
        }
        Ok(())
    }

    /// The accumulated import set, sorted.
    pub fn render(&self) -> Vec<String> {
        self.seen.iter().cloned().collect()
    }
}
