//! Entry points for an embedding host.
//!
//! The host only distinguishes "value" from "no value", so every failure is
//! flattened to `None` here. The structured error is logged before it is
//! dropped.

use log::debug;

use crate::error::{Error, Result};
use crate::lookup::{self, EntryMetadata};

/// List the entries of `archive`.
///
/// Returns `None` when the buffer is absent or empty. A corrupt archive
/// yields the entries read before the first bad header.
pub fn list_contents(archive: Option<&[u8]>) -> Option<Vec<EntryMetadata>> {
    host_value(archive_arg(archive).and_then(lookup::list_entries))
}

/// Return the payload of the entry called `name`.
///
/// Returns `None` when the buffer is absent or empty, when no entry has that
/// name, or when the archive is corrupt.
pub fn read_file(archive: Option<&[u8]>, name: &str) -> Option<Vec<u8>> {
    host_value(archive_arg(archive).and_then(|data| lookup::extract(data, name))).flatten()
}

fn archive_arg(archive: Option<&[u8]>) -> Result<&[u8]> {
    archive.ok_or(Error::InvalidStream)
}

fn host_value<T>(result: Result<T>) -> Option<T> {
    result.map_err(|e| debug!("returning no value: {}", e)).ok()
}
