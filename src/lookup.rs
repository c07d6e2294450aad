//! Listing and extraction over a whole archive buffer.
//!
//! Every call opens its own [`Reader`] at offset 0, so calls are independent
//! and can run concurrently over the same buffer.

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::error::Result;
use crate::tar::{Header, Reader};

/// Metadata of one archive entry, as reported by [`list_entries`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    pub name: String,
    pub size: u64,
    /// Raw type flag byte, see the constants in [`crate::tar`]
    pub entry_type: u8,
    pub mode: u32,
    pub mtime: u64,
}

impl EntryMetadata {
    /// Modification time as a UTC timestamp.
    /// `None` when `mtime` is beyond what chrono can represent.
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.mtime)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

impl From<&Header> for EntryMetadata {
    fn from(header: &Header) -> Self {
        Self {
            name: header.name.clone(),
            size: header.size,
            entry_type: header.typeflag,
            mode: header.mode,
            mtime: header.mtime,
        }
    }
}

/// How listing treats a malformed header or a truncated archive.
///
/// Both policies detect the same faults: a header failing validation, a
/// partial header block, or a payload running past the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListPolicy {
    /// Stop at the first fault and return the entries before it
    #[default]
    Lenient,
    /// Fail the whole listing on the first fault
    Strict,
}

/// List every entry in archive order, stopping quietly at the first fault.
pub fn list_entries(data: &[u8]) -> Result<Vec<EntryMetadata>> {
    list_entries_with(data, ListPolicy::Lenient)
}

/// List every entry in archive order.
///
/// An empty buffer is always an error. Other errors follow `policy`.
pub fn list_entries_with(data: &[u8], policy: ListPolicy) -> Result<Vec<EntryMetadata>> {
    let mut reader = Reader::open(data)?;
    let mut entries = Vec::new();
    for header in reader.checked_entries() {
        match header {
            Ok(header) => entries.push(EntryMetadata::from(&header)),
            Err(e) if policy == ListPolicy::Lenient => {
                warn!("listing stopped after {} entries: {}", entries.len(), e);
                break;
            }
            Err(e) => return Err(e),
        }
    }
    debug!("listed {} entries", entries.len());
    Ok(entries)
}

/// Find the first entry named exactly `name` and copy out its payload.
///
/// Returns `Ok(None)` when no entry has that name. Corrupt headers met
/// before the match and truncated payloads are errors.
pub fn extract(data: &[u8], name: &str) -> Result<Option<Vec<u8>>> {
    let mut reader = Reader::open(data)?;
    let Some(header) = reader.find(name)? else {
        return Ok(None);
    };
    // bounds are checked before allocating header.size bytes
    let payload = reader.data(&header)?;
    let mut out = vec![0u8; payload.len()];
    reader.read_data(&header, &mut out)?;
    Ok(Some(out))
}
