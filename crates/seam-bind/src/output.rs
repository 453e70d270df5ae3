//! The structured output of one generation pass.
//!
//! A bound module is the machine form a textual backend would render:
//! named entry points with wire-level signatures and invocable bodies,
//! interleaved with skip annotations in emission order, under a
//! preamble that is computed after the body but placed first.

use std::fmt;

use serde::{Deserialize, Serialize};

use seam_core::value::CallError;
use seam_core::wire::{Wire, WireType};

use crate::error::{BindError, ErrorList};

/// One generated boundary entry point.
pub struct EntryPoint {
    /// Entry symbol, e.g. `proxyexample_hello__Greet`.
    pub name: String,
    pub params: Vec<WireType>,
    pub results: Vec<WireType>,
    /// The entry body: wire arguments in, wire results out.
    pub invoke: Box<dyn Fn(&[Wire]) -> Result<Vec<Wire>, CallError> + Send + Sync>,
}

impl EntryPoint {
    pub fn call(&self, args: &[Wire]) -> Result<Vec<Wire>, CallError> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("results", &self.results)
            .finish_non_exhaustive()
    }
}

/// One item of the module body, in emission order.
#[derive(Debug)]
pub enum Item {
    Entry(EntryPoint),
    /// A skipped declaration, recorded where its output would have been.
    Annotation(String),
}

/// The module header. Filled in last, once the body is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preamble {
    /// Short name of the bound package.
    pub package: String,
    /// Import path of the bound package.
    pub path: String,
    /// Content digest of the package description.
    pub digest: String,
    /// Sorted foreign packages referenced by the body.
    pub imports: Vec<String>,
}

/// The generated module for one bound package.
#[derive(Debug)]
pub struct BoundModule {
    pub preamble: Preamble,
    pub items: Vec<Item>,
}

impl BoundModule {
    /// Look up an entry point by its symbol name.
    pub fn entry(&self, name: &str) -> Option<&EntryPoint> {
        self.items.iter().find_map(|item| match item {
            Item::Entry(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// The skip annotations, in emission order.
    pub fn annotations(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            Item::Annotation(a) => Some(a.as_str()),
            _ => None,
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &EntryPoint> {
        self.items.iter().filter_map(|item| match item {
            Item::Entry(e) => Some(e),
            _ => None,
        })
    }
}

/// A whole generation pass: the module plus the fatal errors raised
/// while producing it. Partial output survives errors; success is
/// judged once, at the end, on the aggregated list.
#[derive(Debug)]
pub struct BindOutput {
    pub module: BoundModule,
    pub errors: Vec<BindError>,
}

impl BindOutput {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The module if no fatal error was recorded, the aggregated list
    /// otherwise.
    pub fn into_result(self) -> Result<BoundModule, ErrorList> {
        if self.errors.is_empty() {
            Ok(self.module)
        } else {
            Err(ErrorList(self.errors))
        }
    }
}
