// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Executable image validation and segment enumeration.
//!
//! The loader reads a fixed-size prefix of an executable and parses it as
//! a 64-bit little-endian ELF binary. Only the fields the loader needs are
//! interpreted: the entry point and the loadable segment records. All
//! header material must fit inside the prefix; images with program header
//! tables beyond it are rejected.

#[cfg(test)]
mod image_test;

use core::fmt;
use skua_abi::{PAGE_SIZE, Vaddr};

/// How much of the executable the loader reads before deciding anything.
///
/// Large enough for the file header plus a handful of program headers,
/// small enough to live on the stack.
pub const PREFIX_SIZE: usize = 512;

const MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
const CLASS_64: u8 = 2;
const DATA_LITTLE_ENDIAN: u8 = 1;
const TYPE_EXECUTABLE: u16 = 2;
const SEGMENT_LOAD: u32 = 1;
const SEGMENT_FLAG_WRITE: u32 = 2;

const HEADER_SIZE: usize = 64;
const PROGRAM_HEADER_SIZE: usize = 56;

/// Why an image was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageError {
    /// The prefix does not even cover the file header.
    TooShort,
    /// The magic bytes are wrong; this is not an executable image.
    BadMagic,
    /// The image is not 64-bit.
    NotClass64,
    /// The image is not little-endian.
    NotLittleEndian,
    /// The image is not an executable (relocatable or shared object).
    NotExecutable,
    /// A program header record is smaller than the format requires.
    MalformedHeader,
    /// The program header table does not fit inside the prefix.
    HeadersOutsidePrefix,
    /// A segment claims more file content than memory to put it in.
    SegmentSizes,
    /// A segment's file offset and virtual address disagree within the
    /// page, so its pages cannot be mapped.
    MisalignedSegment,
    /// A segment's extent wraps around the 64-bit address space.
    SegmentBounds,
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "image shorter than its file header"),
            Self::BadMagic => write!(f, "bad magic bytes"),
            Self::NotClass64 => write!(f, "not a 64-bit image"),
            Self::NotLittleEndian => write!(f, "not little-endian"),
            Self::NotExecutable => write!(f, "not an executable"),
            Self::MalformedHeader => write!(f, "malformed program header record"),
            Self::HeadersOutsidePrefix => {
                write!(f, "program header table outside the read prefix")
            }
            Self::SegmentSizes => write!(f, "segment file size exceeds memory size"),
            Self::MisalignedSegment => {
                write!(f, "segment offset and address disagree within the page")
            }
            Self::SegmentBounds => {
                write!(f, "segment extends past the end of the address space")
            }
        }
    }
}

/// One loadable segment of a validated image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Byte offset of the segment's content in the file.
    pub offset: u64,
    /// Virtual address the segment loads at.
    pub vaddr: Vaddr,
    /// Bytes of content in the file.
    pub file_size: u64,
    /// Bytes of memory the segment occupies; any tail beyond
    /// [`Segment::file_size`] is zero-filled.
    pub mem_size: u64,
    /// Whether the segment needs a private writable copy.
    pub writable: bool,
}

/// A validated view over an executable's prefix.
///
/// Parsing checks everything up front; [`Image::segments`] afterwards
/// yields only well-formed loadable segments.
#[derive(Debug, PartialEq, Eq)]
pub struct Image<'a> {
    prefix: &'a [u8],
    entry: Vaddr,
    table_offset: usize,
    record_size: usize,
    records: usize,
}

impl<'a> Image<'a> {
    /// Validate an executable prefix.
    pub fn parse(prefix: &'a [u8]) -> Result<Self, ImageError> {
        if prefix.len() < HEADER_SIZE {
            return Err(ImageError::TooShort);
        }
        if prefix[..4] != MAGIC {
            return Err(ImageError::BadMagic);
        }
        if prefix[4] != CLASS_64 {
            return Err(ImageError::NotClass64);
        }
        if prefix[5] != DATA_LITTLE_ENDIAN {
            return Err(ImageError::NotLittleEndian);
        }
        if read_u16(prefix, 16) != TYPE_EXECUTABLE {
            return Err(ImageError::NotExecutable);
        }

        let entry = Vaddr::new(read_u64(prefix, 24));
        let table_offset = read_u64(prefix, 32) as usize;
        let record_size = read_u16(prefix, 54) as usize;
        let records = read_u16(prefix, 56) as usize;

        if record_size < PROGRAM_HEADER_SIZE {
            return Err(ImageError::MalformedHeader);
        }
        let table_end = table_offset
            .checked_add(
                records
                    .checked_mul(record_size)
                    .ok_or(ImageError::HeadersOutsidePrefix)?,
            )
            .ok_or(ImageError::HeadersOutsidePrefix)?;
        if table_end > prefix.len() {
            return Err(ImageError::HeadersOutsidePrefix);
        }

        let image = Self {
            prefix,
            entry,
            table_offset,
            record_size,
            records,
        };
        for segment in image.segments() {
            if segment.file_size > segment.mem_size {
                return Err(ImageError::SegmentSizes);
            }
            if segment.offset % PAGE_SIZE != segment.vaddr.page_offset() {
                return Err(ImageError::MisalignedSegment);
            }
            // Both the file extent and the memory extent must survive the
            // loader's page rounding without wrapping.
            if rounded_end(segment.offset, segment.mem_size).is_none()
                || rounded_end(segment.vaddr.as_u64(), segment.mem_size).is_none()
            {
                return Err(ImageError::SegmentBounds);
            }
        }
        Ok(image)
    }

    /// The entry point address.
    #[inline]
    #[must_use]
    pub const fn entry_point(&self) -> Vaddr {
        self.entry
    }

    /// The loadable segments, in table order.
    #[must_use]
    pub fn segments(&self) -> impl Iterator<Item = Segment> + 'a {
        let prefix = self.prefix;
        let table_offset = self.table_offset;
        let record_size = self.record_size;
        (0..self.records).filter_map(move |index| {
            let base = table_offset + index * record_size;
            if read_u32(prefix, base) != SEGMENT_LOAD {
                return None;
            }
            Some(Segment {
                offset: read_u64(prefix, base + 8),
                vaddr: Vaddr::new(read_u64(prefix, base + 16)),
                file_size: read_u64(prefix, base + 32),
                mem_size: read_u64(prefix, base + 40),
                writable: read_u32(prefix, base + 4) & SEGMENT_FLAG_WRITE != 0,
            })
        })
    }
}

/// End of a segment extent, rounded up to a page boundary; `None` if any
/// step wraps around the address space.
const fn rounded_end(base: u64, len: u64) -> Option<u64> {
    match base.checked_add(len) {
        Some(end) => end.checked_add(PAGE_SIZE - 1),
        None => None,
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    let mut word = [0u8; 2];
    word.copy_from_slice(&bytes[offset..offset + 2]);
    u16::from_le_bytes(word)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(word)
}
