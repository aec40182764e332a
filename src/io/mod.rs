//! Bounded, memory-mapped access to the binary under inspection.
//!
//! Section providers parse the whole image, so the reader hands out the
//! mapped file as one slice and charges it against the read budget once.
//! Byte streams are copied out into [`Bytes`] so they outlive the mapping.

pub mod error;

use crate::io::error::{IoError, Result};
use bytes::Bytes;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Defines the resource limits for reading a binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IOLimits {
    /// The absolute maximum file size that can be opened.
    pub max_file_size: u64,
    /// The maximum total number of bytes handed out across all reads.
    pub max_read_bytes: u64,
}

impl Default for IOLimits {
    fn default() -> Self {
        Self {
            max_file_size: 512 * 1024 * 1024,  // 512MB
            max_read_bytes: 1024 * 1024 * 1024, // 1GB
        }
    }
}

/// A bounded file reader backed by a read-only memory map.
pub struct SafeReader {
    path: PathBuf,
    // None when the file size is zero; memmap cannot map empty files.
    mmap: Option<Mmap>,
    limits: IOLimits,
    bytes_read: u64,
    file_size: u64,
}

impl SafeReader {
    /// Opens a file and memory-maps it.
    ///
    /// Fails if the file size exceeds `limits.max_file_size`.
    pub fn open<P: AsRef<Path>>(path: P, limits: IOLimits) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        debug!(
            path = %path.display(),
            size = file_size,
            limits.max_file_size = limits.max_file_size,
            "Opening binary"
        );

        if file_size > limits.max_file_size {
            warn!(
                path = %path.display(),
                size = file_size,
                limit = limits.max_file_size,
                "Binary is too large"
            );
            return Err(IoError::FileTooLarge {
                limit: limits.max_file_size,
                found: file_size,
            });
        }

        let mmap = if file_size == 0 {
            None
        } else {
            // Safety: read-only map of a regular file we just opened.
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            limits,
            bytes_read: 0,
            file_size,
        })
    }

    /// Returns the total size of the underlying file in bytes.
    pub fn size(&self) -> u64 {
        self.file_size
    }

    /// Returns the total number of bytes handed out so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn charge(&mut self, len: u64) -> Result<()> {
        if self.bytes_read.saturating_add(len) > self.limits.max_read_bytes {
            warn!(
                path = %self.path.display(),
                current_read = self.bytes_read,
                requested = len,
                limit = self.limits.max_read_bytes,
                "Read limit exceeded"
            );
            return Err(IoError::ReadLimitExceeded {
                limit: self.limits.max_read_bytes,
                current: self.bytes_read,
                requested: len,
            });
        }
        self.bytes_read += len;
        Ok(())
    }

    /// Borrows the entire mapped image, charging its full size to the budget.
    pub fn image(&mut self) -> Result<&[u8]> {
        self.charge(self.file_size)?;
        trace!(path = %self.path.display(), len = self.file_size, "Mapped full image");
        Ok(self.mmap.as_deref().unwrap_or(&[]))
    }

    /// Copies `len` bytes starting at `offset`, truncated at end of file.
    pub fn read_at(&mut self, offset: u64, len: u64) -> Result<Bytes> {
        let map = match &self.mmap {
            Some(m) => m,
            None => return Ok(Bytes::new()),
        };
        let start = offset as usize;
        if start >= map.len() {
            return Ok(Bytes::new());
        }
        let end = start.saturating_add(len as usize).min(map.len());
        let out = Bytes::copy_from_slice(&map[start..end]);
        self.charge(out.len() as u64)?;
        trace!(path = %self.path.display(), offset, len = out.len(), "Performed read");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_file(content: &[u8]) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content).unwrap();
        temp_file
    }

    #[test]
    fn open_file_successfully() {
        let file = create_temp_file(b"\x7fELF....");
        let reader = SafeReader::open(file.path(), IOLimits::default()).unwrap();
        assert_eq!(reader.size(), 8);
    }

    #[test]
    fn open_file_too_large() {
        let file = create_temp_file(&[0; 100]);
        let limits = IOLimits {
            max_file_size: 50,
            max_read_bytes: 1000,
        };
        let result = SafeReader::open(file.path(), limits);
        assert!(matches!(result, Err(IoError::FileTooLarge { .. })));
    }

    #[test]
    fn image_charges_budget_once() {
        let file = create_temp_file(&[0xC3; 64]);
        let mut reader = SafeReader::open(file.path(), IOLimits::default()).unwrap();
        let image = reader.image().unwrap();
        assert_eq!(image.len(), 64);
        assert_eq!(reader.bytes_read(), 64);
    }

    #[test]
    fn image_respects_read_limit() {
        let file = create_temp_file(&[0; 100]);
        let limits = IOLimits {
            max_file_size: 1000,
            max_read_bytes: 50,
        };
        let mut reader = SafeReader::open(file.path(), limits).unwrap();
        assert!(matches!(
            reader.image(),
            Err(IoError::ReadLimitExceeded { requested: 100, .. })
        ));
        assert_eq!(reader.bytes_read(), 0);
    }

    #[test]
    fn read_past_eof_returns_partial() {
        let file = create_temp_file(b"\x01\x02\xc3\x03\xc3");
        let mut reader = SafeReader::open(file.path(), IOLimits::default()).unwrap();
        let data = reader.read_at(3, 10).unwrap();
        assert_eq!(data, &b"\x03\xc3"[..]);
        assert_eq!(reader.bytes_read(), 2);
    }

    #[test]
    fn open_empty_file() {
        let file = create_temp_file(b"");
        let mut reader = SafeReader::open(file.path(), IOLimits::default()).unwrap();
        assert_eq!(reader.size(), 0);
        assert!(reader.image().unwrap().is_empty());
        assert!(reader.read_at(0, 10).unwrap().is_empty());
    }
}
