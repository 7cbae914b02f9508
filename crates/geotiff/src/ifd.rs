//! Low-level classic TIFF writing.
//!
//! Files are little-endian classic TIFF:
//!
//! ```text
//! +--------+---------------------------+----------------+
//! | header | strip/tile blocks (append) | IFDs (at end)  |
//! +--------+---------------------------+----------------+
//! ```
//!
//! Image data is appended as it is produced; the directories are written
//! last, once every block offset is known, and the header is patched to
//! point at the first one.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{GeoTiffError, Result};

pub(crate) const NEW_SUBFILE_TYPE: u16 = 254;
pub(crate) const IMAGE_WIDTH: u16 = 256;
pub(crate) const IMAGE_LENGTH: u16 = 257;
pub(crate) const BITS_PER_SAMPLE: u16 = 258;
pub(crate) const COMPRESSION: u16 = 259;
pub(crate) const PHOTOMETRIC: u16 = 262;
pub(crate) const STRIP_OFFSETS: u16 = 273;
pub(crate) const SAMPLES_PER_PIXEL: u16 = 277;
pub(crate) const ROWS_PER_STRIP: u16 = 278;
pub(crate) const STRIP_BYTE_COUNTS: u16 = 279;
pub(crate) const PLANAR_CONFIGURATION: u16 = 284;
pub(crate) const TILE_WIDTH: u16 = 322;
pub(crate) const TILE_LENGTH: u16 = 323;
pub(crate) const TILE_OFFSETS: u16 = 324;
pub(crate) const TILE_BYTE_COUNTS: u16 = 325;
pub(crate) const SAMPLE_FORMAT: u16 = 339;

/// Adobe deflate (zlib stream).
pub(crate) const COMPRESSION_DEFLATE: u16 = 8;
/// NewSubfileType bit marking a reduced-resolution copy.
pub(crate) const SUBFILE_REDUCED: u32 = 1;

const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_DOUBLE: u16 = 12;

/// Value of a single IFD entry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldValue {
    Short(Vec<u16>),
    Long(Vec<u32>),
    Double(Vec<f64>),
    Ascii(String),
}

impl FieldValue {
    fn field_type(&self) -> u16 {
        match self {
            Self::Short(_) => TYPE_SHORT,
            Self::Long(_) => TYPE_LONG,
            Self::Double(_) => TYPE_DOUBLE,
            Self::Ascii(_) => TYPE_ASCII,
        }
    }

    fn count(&self) -> u32 {
        match self {
            Self::Short(v) => v.len() as u32,
            Self::Long(v) => v.len() as u32,
            Self::Double(v) => v.len() as u32,
            // NUL terminator is part of the count
            Self::Ascii(s) => s.len() as u32 + 1,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Short(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::Long(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::Double(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::Ascii(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                bytes
            }
        }
    }
}

/// An image file directory, entries kept sorted by tag as TIFF requires.
#[derive(Debug, Default)]
pub(crate) struct Ifd {
    entries: BTreeMap<u16, FieldValue>,
}

impl Ifd {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, tag: u16, value: FieldValue) {
        self.entries.insert(tag, value);
    }

    /// Tags shared by every single-band 8-bit image we write.
    pub(crate) fn gray8(width: usize, height: usize, subfile_type: u32) -> Result<Self> {
        let mut ifd = Self::new();
        ifd.insert(NEW_SUBFILE_TYPE, FieldValue::Long(vec![subfile_type]));
        ifd.insert(IMAGE_WIDTH, FieldValue::Long(vec![to_u32(width)?]));
        ifd.insert(IMAGE_LENGTH, FieldValue::Long(vec![to_u32(height)?]));
        ifd.insert(BITS_PER_SAMPLE, FieldValue::Short(vec![8]));
        ifd.insert(COMPRESSION, FieldValue::Short(vec![COMPRESSION_DEFLATE]));
        // BlackIsZero
        ifd.insert(PHOTOMETRIC, FieldValue::Short(vec![1]));
        ifd.insert(SAMPLES_PER_PIXEL, FieldValue::Short(vec![1]));
        ifd.insert(PLANAR_CONFIGURATION, FieldValue::Short(vec![1]));
        // Unsigned integer
        ifd.insert(SAMPLE_FORMAT, FieldValue::Short(vec![1]));
        Ok(ifd)
    }

    /// Serialized size of the directory itself, excluding out-of-line values.
    fn directory_len(&self) -> u64 {
        2 + 12 * self.entries.len() as u64 + 4
    }
}

/// A TIFF file being written front to back.
pub(crate) struct TiffFile {
    writer: BufWriter<File>,
    position: u64,
}

impl TiffFile {
    /// Create a new file, failing if anything already exists at `path`.
    pub(crate) fn create_new(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let mut writer = BufWriter::new(file);
        // "II", magic 42, first IFD offset patched in `finish`
        writer.write_all(&[b'I', b'I', 42, 0, 0, 0, 0, 0])?;
        Ok(Self {
            writer,
            position: 8,
        })
    }

    /// Append a data block at the next word boundary, returning its offset.
    pub(crate) fn append(&mut self, block: &[u8]) -> Result<u32> {
        self.align()?;
        let offset = to_offset(self.position)?;
        self.writer.write_all(block)?;
        self.position += block.len() as u64;
        to_offset(self.position)?;
        Ok(offset)
    }

    /// Write a directory followed by its out-of-line values.
    ///
    /// Returns the directory offset so callers can chain directories.
    pub(crate) fn write_ifd(&mut self, ifd: &Ifd, next_ifd: u32) -> Result<u32> {
        self.align()?;
        let ifd_offset = self.position;
        let mut data_offset = ifd_offset + ifd.directory_len();

        let mut directory = Vec::with_capacity(ifd.directory_len() as usize);
        let mut overflow = Vec::new();

        directory.extend_from_slice(&(ifd.entries.len() as u16).to_le_bytes());
        for (tag, value) in &ifd.entries {
            let bytes = value.to_bytes();
            directory.extend_from_slice(&tag.to_le_bytes());
            directory.extend_from_slice(&value.field_type().to_le_bytes());
            directory.extend_from_slice(&value.count().to_le_bytes());
            if bytes.len() <= 4 {
                let mut inline = [0u8; 4];
                inline[..bytes.len()].copy_from_slice(&bytes);
                directory.extend_from_slice(&inline);
            } else {
                directory.extend_from_slice(&to_offset(data_offset)?.to_le_bytes());
                data_offset += bytes.len() as u64;
                overflow.extend_from_slice(&bytes);
                if data_offset % 2 == 1 {
                    overflow.push(0);
                    data_offset += 1;
                }
            }
        }
        directory.extend_from_slice(&next_ifd.to_le_bytes());

        self.writer.write_all(&directory)?;
        self.writer.write_all(&overflow)?;
        self.position = data_offset;
        to_offset(self.position)?;

        to_offset(ifd_offset)
    }

    /// Point the header at the first directory and flush everything to disk.
    pub(crate) fn finish(mut self, first_ifd: u32) -> Result<()> {
        self.writer.seek(SeekFrom::Start(4))?;
        self.writer.write_all(&first_ifd.to_le_bytes())?;
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }

    fn align(&mut self) -> Result<()> {
        if self.position % 2 == 1 {
            self.writer.write_all(&[0])?;
            self.position += 1;
        }
        Ok(())
    }
}

/// Deflate-compress one strip or tile.
pub(crate) fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn to_offset(position: u64) -> Result<u32> {
    u32::try_from(position).map_err(|_| GeoTiffError::TooLarge)
}

pub(crate) fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| GeoTiffError::TooLarge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_encoding() {
        assert_eq!(FieldValue::Short(vec![1, 2]).to_bytes(), vec![1, 0, 2, 0]);
        assert_eq!(FieldValue::Long(vec![258]).to_bytes(), vec![2, 1, 0, 0]);
        assert_eq!(FieldValue::Ascii("ab".into()).count(), 3);
        assert_eq!(FieldValue::Double(vec![1.0]).to_bytes().len(), 8);
    }

    #[test]
    fn test_ifd_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.tif");

        let mut file = TiffFile::create_new(&path).unwrap();
        // Odd-sized block forces alignment padding before the IFD
        let block = file.append(&[7, 7, 7]).unwrap();
        assert_eq!(block, 8);

        let mut ifd = Ifd::new();
        ifd.insert(IMAGE_WIDTH, FieldValue::Long(vec![3]));
        ifd.insert(BITS_PER_SAMPLE, FieldValue::Short(vec![8]));
        ifd.insert(STRIP_OFFSETS, FieldValue::Long(vec![8, 8]));
        let ifd_offset = file.write_ifd(&ifd, 0).unwrap();
        assert_eq!(ifd_offset, 12);
        file.finish(ifd_offset).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], &[b'I', b'I', 42, 0]);
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 12);

        let at = ifd_offset as usize;
        assert_eq!(u16::from_le_bytes([bytes[at], bytes[at + 1]]), 3);
        // Entries sorted by tag: 256, 258, 273
        let first_tag = u16::from_le_bytes([bytes[at + 2], bytes[at + 3]]);
        assert_eq!(first_tag, IMAGE_WIDTH);
        // StripOffsets (8 bytes) is stored out of line right after the directory
        let entry = at + 2 + 2 * 12;
        let value_offset = u32::from_le_bytes(bytes[entry + 8..entry + 12].try_into().unwrap());
        assert_eq!(value_offset as usize, at + 2 + 3 * 12 + 4);
    }

    #[test]
    fn test_create_new_refuses_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exists.tif");
        std::fs::write(&path, b"x").unwrap();
        assert!(matches!(
            TiffFile::create_new(&path),
            Err(GeoTiffError::Io(_))
        ));
    }
}
