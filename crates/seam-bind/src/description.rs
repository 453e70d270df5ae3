//! Loading and fingerprinting package descriptions.
//!
//! The typed model normally arrives as data from the front-end; these
//! helpers also accept it as serialized JSON, validate the minimum
//! shape, and compute the content digest surfaced in the preamble.

use std::path::Path;

use sha2::{Digest, Sha256};

use seam_core::package::BoundPackage;

use crate::error::{BindError, Result};

/// Parse a description from JSON text.
pub fn from_json(text: &str) -> Result<BoundPackage> {
    let pkg: BoundPackage = serde_json::from_str(text)?;
    validate(&pkg)?;
    Ok(pkg)
}

/// Read and parse a description file.
pub fn load(path: impl AsRef<Path>) -> Result<BoundPackage> {
    let text = std::fs::read_to_string(path)?;
    from_json(&text)
}

/// Minimum-shape validation: a description must name its package and
/// carry its import path.
pub fn validate(pkg: &BoundPackage) -> Result<()> {
    if pkg.name.is_empty() {
        return Err(BindError::InvalidDescription {
            detail: "package name is empty".to_string(),
        });
    }
    if pkg.path.is_empty() {
        return Err(BindError::InvalidDescription {
            detail: "package import path is empty".to_string(),
        });
    }
    Ok(())
}

/// Content digest of a description: sha256 over its canonical JSON.
pub fn digest(pkg: &BoundPackage) -> String {
    let json = serde_json::to_vec(pkg).expect("description serialization should not fail");
    let mut hasher = Sha256::new();
    hasher.update(&json);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
