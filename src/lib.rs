//! Return-oriented-programming gadget scanner.
//!
//! Finds byte windows in executable sections that end in an anchor opcode
//! (0xC3, `ret`, by default) and decode to an instruction run terminating
//! exactly there, then counts them by content and by position.
//!
//! ```no_run
//! use ropcheck::config::RopCheckConfig;
//! use std::path::Path;
//!
//! let report = ropcheck::pipeline::scan_binary(Path::new("a.out"), &RopCheckConfig::default())?;
//! println!("{}", report.to_text());
//! # Ok::<(), ropcheck::error::RopCheckError>(())
//! ```

/// Section providers and byte extractors
pub mod binary;
/// Configuration management
pub mod config;
/// Core data types
pub mod core;
/// Instruction decoders
pub mod disasm;
/// Error types
pub mod error;
/// Gadget search and deduplication
pub mod gadgets;
/// Content digests
pub mod hashing;
/// Bounded file access
pub mod io;
/// Logging and tracing infrastructure
pub mod logging;
/// Whole-binary orchestration
pub mod pipeline;
/// External tool runner
pub mod process;
/// Scan results and rendering
pub mod report;
/// Timeout utilities
pub mod timeout;

pub use crate::config::RopCheckConfig;
pub use crate::error::{Result, RopCheckError};
pub use crate::pipeline::{scan_binary, GadgetPipeline};
