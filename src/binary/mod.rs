//! Section discovery and byte extraction.
//!
//! Two seams feed the scanner: a [`SectionProvider`] lists the executable
//! sections of a binary and a [`ByteExtractor`] returns one section's raw
//! bytes. [`ObjectLoader`] implements both in-process; [`tools`] implements
//! them on top of `readelf` and `objdump`.

pub mod object_loader;
pub mod tools;

pub use object_loader::{detect_architecture, ObjectLoader};

use crate::core::{ByteStream, Section};
use crate::error::Result;
use std::path::Path;

/// Lists the executable sections of a binary, in file order.
pub trait SectionProvider: Send + Sync {
    /// Fails with [`crate::error::RopCheckError::BinaryRead`] on an
    /// unreadable file or unrecognized format.
    fn list_sections(&self, path: &Path) -> Result<Vec<Section>>;
}

/// Extracts the raw bytes of one section.
pub trait ByteExtractor: Send + Sync {
    /// Fails with [`crate::error::RopCheckError::Extraction`]. The returned
    /// stream may still differ in length from `section.size`; callers check.
    fn extract_bytes(&self, path: &Path, section: &Section) -> Result<ByteStream>;
}
