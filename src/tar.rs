//! Read-only tar archive reader over an in-memory buffer
//!
//! # Usage
//!
//! ## Walking the entries
//!
//! ```no_run
//! use memtar::tar::Reader;
//!
//! let tar_data = std::fs::read("testdata/test.tar").unwrap();
//! let mut reader = Reader::open(&tar_data).unwrap();
//!
//! for header in reader.entries() {
//!     let header = header.unwrap();
//!     println!("{} ({} bytes)", header.name, header.size);
//! }
//! ```
//!
//! ## Peek a header, then read its payload
//!
//! ```no_run
//! use memtar::tar::Reader;
//!
//! let tar_data = std::fs::read("testdata/test.tar").unwrap();
//! let mut reader = Reader::open(&tar_data).unwrap();
//!
//! while let Some(header) = reader.read_header().unwrap() {
//!     if header.is_file() {
//!         let data = reader.data(&header).unwrap();
//!         println!("{}: {}", header.name, String::from_utf8_lossy(data));
//!     }
//!     reader.advance_to_next(&header);
//! }
//! ```
//!
//! ## Random access by name
//!
//! ```no_run
//! use memtar::tar::Reader;
//!
//! let tar_data = std::fs::read("testdata/test.tar").unwrap();
//! let mut reader = Reader::open(&tar_data).unwrap();
//!
//! if let Some(header) = reader.find("test.txt").unwrap() {
//!     let mut buf = vec![0u8; header.size as usize];
//!     reader.read_data(&header, &mut buf).unwrap();
//! }
//! ```

use std::fmt;
use std::iter::FusedIterator;
use std::ops::Range;

use log::debug;

use crate::error::{Error, Result};

/// Size of a header block and of every payload block
pub const BLOCK_SIZE: usize = 512;

const NAME: Range<usize> = 0..100;
const MODE: Range<usize> = 100..108;
const SIZE: Range<usize> = 124..136;
const MTIME: Range<usize> = 136..148;
const CHECKSUM: Range<usize> = 148..156;
const TYPEFLAG: usize = 156;
const LINKNAME: Range<usize> = 157..257;

// Type flags
pub const REGULAR: u8 = b'0';
/// Pre-POSIX archives mark regular files with a NUL byte.
pub const REGULAR_OLD: u8 = 0;
pub const HARD_LINK: u8 = b'1';
pub const SYMLINK: u8 = b'2';
pub const CHAR_DEVICE: u8 = b'3';
pub const BLOCK_DEVICE: u8 = b'4';
pub const DIRECTORY: u8 = b'5';
pub const FIFO: u8 = b'6';

/// Decoded header of one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub mode: u32,
    pub size: u64,
    pub mtime: u64,
    pub checksum: u32,
    pub typeflag: u8,
    /// Link target for hard and symbolic links. Reported as stored, never resolved.
    pub linkname: String,
}

impl Header {
    /// Parse a Header from a 512-byte block
    /// Fails when the checksum does not match or a numeric field is not octal
    pub fn from_bytes(block: &[u8]) -> Result<Self> {
        parse_tar_header(block, 0)
    }

    pub fn is_file(&self) -> bool {
        matches!(self.typeflag, REGULAR | REGULAR_OLD)
    }

    pub fn is_dir(&self) -> bool {
        self.typeflag == DIRECTORY
    }

    pub fn is_symlink(&self) -> bool {
        self.typeflag == SYMLINK
    }

    /// Payload size rounded up to a whole number of blocks
    pub fn padded_size(&self) -> u64 {
        self.size
            .div_ceil(BLOCK_SIZE as u64)
            .saturating_mul(BLOCK_SIZE as u64)
    }
}

/// Cursor over a borrowed tar archive.
///
/// The reader never copies or mutates the buffer; its only state is the
/// offset of the current header block.
#[derive(Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("len", &self.data.len())
            .field("pos", &self.pos)
            .finish()
    }
}

impl<'a> Reader<'a> {
    /// Open a reader at the start of `data`. Nothing is parsed yet.
    pub fn open(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::InvalidStream);
        }
        Ok(Self { data, pos: 0 })
    }

    /// Offset of the current header block
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Length of the underlying buffer
    pub fn buffer_len(&self) -> usize {
        self.data.len()
    }

    /// Move the cursor back to the first header
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Parse the header at the cursor without moving it.
    ///
    /// Returns `Ok(None)` at the end of the archive: either the cursor has
    /// reached the end of the buffer or the block is all zeros.
    pub fn read_header(&self) -> Result<Option<Header>> {
        let rest = &self.data[self.pos..];
        if rest.is_empty() {
            debug!("end of buffer at offset {}", self.pos);
            return Ok(None);
        }
        if rest.len() < BLOCK_SIZE {
            return Err(Error::ShortRead {
                offset: self.pos,
                needed: BLOCK_SIZE as u64,
                available: rest.len(),
            });
        }

        let block = &rest[..BLOCK_SIZE];
        if is_empty_block(block) {
            debug!("end-of-archive marker at offset {}", self.pos);
            return Ok(None);
        }
        parse_tar_header(block, self.pos).map(Some)
    }

    /// Borrow the payload of the entry whose header is at the cursor
    pub fn data(&self, header: &Header) -> Result<&'a [u8]> {
        let start = self.pos + BLOCK_SIZE;
        let rest = self.data.get(start..).unwrap_or_default();
        usize::try_from(header.size)
            .ok()
            .and_then(|size| rest.get(..size))
            .ok_or(Error::ShortRead {
                offset: start,
                needed: header.size,
                available: rest.len(),
            })
    }

    /// Copy the payload of the entry whose header is at the cursor into `out`,
    /// which must be exactly `header.size` bytes long.
    pub fn read_data(&self, header: &Header, out: &mut [u8]) -> Result<()> {
        if out.len() as u64 != header.size {
            return Err(Error::BufferSize {
                expected: header.size,
                actual: out.len(),
            });
        }
        out.copy_from_slice(self.data(header)?);
        Ok(())
    }

    /// Skip the current header and its padded payload.
    /// The cursor is clamped to the end of the buffer.
    pub fn advance_to_next(&mut self, header: &Header) {
        let step = (BLOCK_SIZE as u64).saturating_add(header.padded_size());
        let next = usize::try_from(step)
            .ok()
            .and_then(|step| self.pos.checked_add(step))
            .unwrap_or(usize::MAX);
        self.pos = next.min(self.data.len());
    }

    /// Rewind and scan for the first entry whose name is exactly `name`.
    ///
    /// On success the cursor is left on the matching header so that
    /// [`Reader::data`] and [`Reader::read_data`] read its payload.
    pub fn find(&mut self, name: &str) -> Result<Option<Header>> {
        self.rewind();
        for _ in 0..self.max_steps() {
            let Some(header) = self.read_header()? else {
                break;
            };
            // same decoding as the listed name, so every listed name can be found
            if header.name == name {
                debug!("found {} at offset {}", name, self.pos);
                return Ok(Some(header));
            }
            self.advance_to_next(&header);
        }
        debug!("{} not found", name);
        Ok(None)
    }

    /// Iterate over all headers from the start of the archive.
    ///
    /// The iterator advances past each entry it yields and stops after the
    /// first error.
    pub fn entries(&mut self) -> Entries<'_, 'a> {
        self.walk(false)
    }

    /// Like [`Reader::entries`], but an entry whose payload runs past the end
    /// of the buffer yields [`Error::ShortRead`] instead of its header.
    pub fn checked_entries(&mut self) -> Entries<'_, 'a> {
        self.walk(true)
    }

    fn walk(&mut self, check_payload: bool) -> Entries<'_, 'a> {
        self.rewind();
        let steps_left = self.max_steps();
        Entries {
            reader: self,
            steps_left,
            check_payload,
            done: false,
        }
    }

    // Every advance moves at least one block, so a walk never needs more.
    fn max_steps(&self) -> usize {
        self.data.len().div_ceil(BLOCK_SIZE)
    }
}

/// Iterator returned by [`Reader::entries`] and [`Reader::checked_entries`]
#[derive(Debug)]
pub struct Entries<'r, 'a> {
    reader: &'r mut Reader<'a>,
    steps_left: usize,
    check_payload: bool,
    done: bool,
}

impl Iterator for Entries<'_, '_> {
    type Item = Result<Header>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.steps_left == 0 {
            return None;
        }
        self.steps_left -= 1;
        let header = self.reader.read_header().and_then(|header| match header {
            Some(header) if self.check_payload => {
                self.reader.data(&header).map(|_| Some(header))
            }
            other => Ok(other),
        });
        match header {
            Ok(Some(header)) => {
                self.reader.advance_to_next(&header);
                Some(Ok(header))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for Entries<'_, '_> {}

/// Check if a block is empty (all zeros)
fn is_empty_block(data: &[u8]) -> bool {
    data.iter().all(|&b| b == 0)
}

/// Bytes of a NUL-padded field up to the first NUL
fn field_bytes(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

fn read_tar_str(data: &[u8], range: Range<usize>) -> String {
    String::from_utf8_lossy(field_bytes(&data[range])).into_owned()
}

/// Decode an octal ASCII field.
///
/// Leading spaces are skipped and the digits end at the first NUL or space.
/// Only NULs and spaces may follow. An empty field is 0.
fn parse_octal(field: &[u8]) -> Option<u64> {
    let start = field.iter().position(|&b| b != b' ').unwrap_or(field.len());
    let field = &field[start..];
    let end = field
        .iter()
        .position(|&b| b == 0 || b == b' ')
        .unwrap_or(field.len());
    let (digits, rest) = field.split_at(end);
    if rest.iter().any(|&b| b != 0 && b != b' ') {
        return None;
    }
    digits.iter().try_fold(0u64, |acc, &b| match b {
        b'0'..=b'7' => acc.checked_mul(8)?.checked_add(u64::from(b - b'0')),
        _ => None,
    })
}

fn parse_tar_header(block: &[u8], offset: usize) -> Result<Header> {
    let malformed = |reason| Error::MalformedHeader { offset, reason };
    if block.len() < BLOCK_SIZE {
        return Err(malformed("header block is shorter than 512 bytes"));
    }

    let stored = parse_octal(&block[CHECKSUM]).ok_or_else(|| malformed("invalid checksum field"))?;
    let checksum = calc_checksum(block);
    if stored != u64::from(checksum) {
        return Err(malformed("checksum mismatch"));
    }

    let mode = parse_octal(&block[MODE])
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| malformed("invalid mode field"))?;
    let size = parse_octal(&block[SIZE]).ok_or_else(|| malformed("invalid size field"))?;
    let mtime = parse_octal(&block[MTIME]).ok_or_else(|| malformed("invalid mtime field"))?;

    Ok(Header {
        name: read_tar_str(block, NAME),
        mode,
        size,
        mtime,
        checksum,
        typeflag: block[TYPEFLAG],
        linkname: read_tar_str(block, LINKNAME),
    })
}

/// Calc checksum of the header bytes, with the checksum field counted as spaces
pub fn calc_checksum(data: &[u8]) -> u32 {
    data.iter()
        .take(BLOCK_SIZE)
        .enumerate()
        .map(|(i, &b)| if CHECKSUM.contains(&i) { u32::from(b' ') } else { u32::from(b) })
        .sum()
}

/// Archive builder for tests. Produces ustar headers with valid checksums.
#[cfg(test)]
pub(crate) mod testutil {
    use super::{BLOCK_SIZE, CHECKSUM, REGULAR, calc_checksum};

    pub(crate) fn header_block(name: &str, mode: u32, size: u64, typeflag: u8) -> [u8; BLOCK_SIZE] {
        let mut block = [0u8; BLOCK_SIZE];
        let name_bytes = name.as_bytes();
        let name_len = name_bytes.len().min(100);
        block[0..name_len].copy_from_slice(&name_bytes[..name_len]);
        write_octal(&mut block[100..108], u64::from(mode));
        write_octal(&mut block[108..116], 0);
        write_octal(&mut block[116..124], 0);
        write_octal(&mut block[124..136], size);
        write_octal(&mut block[136..148], 1_700_000_000);
        block[156] = typeflag;
        block[257..263].copy_from_slice(b"ustar\0");
        block[263..265].copy_from_slice(b"00");
        reseal(&mut block);
        block
    }

    /// Recompute and store the checksum after editing a block
    pub(crate) fn reseal(block: &mut [u8]) {
        let checksum = format!("{:06o}\0 ", calc_checksum(block));
        block[CHECKSUM].copy_from_slice(checksum.as_bytes());
    }

    fn write_octal(field: &mut [u8], value: u64) {
        let digits = format!("{:0width$o}", value, width = field.len() - 1);
        field[..digits.len()].copy_from_slice(digits.as_bytes());
    }

    #[derive(Default)]
    pub(crate) struct ArchiveBuilder {
        bytes: Vec<u8>,
    }

    impl ArchiveBuilder {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn file(self, name: &str, data: &[u8]) -> Self {
            self.entry(header_block(name, 0o644, data.len() as u64, REGULAR), data)
        }

        pub(crate) fn entry(mut self, header: [u8; BLOCK_SIZE], data: &[u8]) -> Self {
            self.bytes.extend_from_slice(&header);
            self.bytes.extend_from_slice(data);
            let padding = (BLOCK_SIZE - data.len() % BLOCK_SIZE) % BLOCK_SIZE;
            self.bytes.resize(self.bytes.len() + padding, 0);
            self
        }

        /// Archive without the end-of-archive marker
        pub(crate) fn unterminated(self) -> Vec<u8> {
            self.bytes
        }

        pub(crate) fn finish(mut self) -> Vec<u8> {
            self.bytes.extend_from_slice(&[0u8; BLOCK_SIZE * 2]);
            self.bytes
        }
    }
}
