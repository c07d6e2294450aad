//! Read-only tar archive reader over in-memory buffers
//!
//! The archive is never copied or modified: every operation borrows the
//! caller's bytes for the duration of one traversal.
//!
//! # Usage
//!
//! ## Listing entries
//!
//! ```no_run
//! use memtar::list_entries;
//!
//! let tar_data = std::fs::read("testdata/test.tar").unwrap();
//! match list_entries(&tar_data) {
//!     Ok(entries) => {
//!         println!("Files in archive:");
//!         for entry in entries {
//!             println!("  {} ({} bytes)", entry.name, entry.size);
//!         }
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! ## Extracting one entry
//!
//! ```no_run
//! use memtar::extract;
//!
//! let tar_data = std::fs::read("testdata/test.tar").unwrap();
//! match extract(&tar_data, "test.txt") {
//!     Ok(Some(data)) => println!("{}", String::from_utf8_lossy(&data)),
//!     Ok(None) => println!("test.txt is not in the archive"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! ## Strict listing
//!
//! By default a listing stops at the first corrupt header and returns what
//! it read so far. [`ListPolicy::Strict`] turns that into an error instead.
//!
//! ```no_run
//! use memtar::{list_entries_with, ListPolicy};
//!
//! let tar_data = std::fs::read("testdata/test.tar").unwrap();
//! let entries = list_entries_with(&tar_data, ListPolicy::Strict).unwrap();
//! ```
//!
//! ## Host bindings
//!
//! [`binding::list_contents`] and [`binding::read_file`] collapse every
//! failure to `None` for hosts that only understand "value or nothing".
//!
//! ## Low-level API
//!
//! [`tar::Reader`] exposes the header-then-data protocol directly; see the
//! [`tar`] module.

pub mod binding;
pub mod error;
pub mod lookup;
pub mod tar;

pub use error::{Error, Result};
pub use lookup::{EntryMetadata, ListPolicy, extract, list_entries, list_entries_with};
pub use tar::{Header, Reader};
