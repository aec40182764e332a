//! Executable section descriptor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One executable section of a binary, as reported by a section provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Section {
    /// Section name (e.g., ".text", ".init")
    pub name: String,
    /// Address of the first byte
    pub start: u64,
    /// Declared size in bytes
    pub size: u64,
}

impl Section {
    pub fn new(name: impl Into<String>, start: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            start,
            size,
        }
    }

    /// Last address within the section, `None` for an empty section.
    pub fn end(&self) -> Option<u64> {
        self.size
            .checked_sub(1)
            .and_then(|last| self.start.checked_add(last))
    }

    /// Only non-empty sections are accepted into scanning.
    pub fn is_scannable(&self) -> bool {
        self.size > 0
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Section {} @ {:#010x} - {:#010x}",
            self.name,
            self.start,
            self.start.saturating_add(self.size)
        )
    }
}
