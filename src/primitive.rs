//! Byte-level read/write of the wire's elementary types.
//!
//! Every primitive has a pure reader and a pure writer working over
//! anything that implements [`std::io::Read`] / [`std::io::Write`]. All
//! multi-byte integers are big-endian on the wire. Strings are UTF-8,
//! `\0`-terminated, with the terminator consumed by the reader and written
//! by the writer.

use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::io::{self, Read, Write};

/// A primitive type that can be read from big-endian bytes.
pub trait ReadFromBytes: Sized {
    /// Read one value, consuming exactly its wire width (or, for strings,
    /// up to and including the terminating `0x00`).
    fn read_from_bytes<R: Read>(reader: R) -> io::Result<Self>;
}

/// A primitive type that can be written to big-endian bytes.
pub trait WriteToBytes {
    /// Write one value.
    fn write_to_bytes<W: Write>(&self, writer: W) -> io::Result<()>;
}

impl ReadFromBytes for u8 {
    fn read_from_bytes<R: Read>(mut reader: R) -> io::Result<Self> {
        reader.read_u8()
    }
}

impl WriteToBytes for u8 {
    fn write_to_bytes<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u8(*self)
    }
}

impl ReadFromBytes for i8 {
    fn read_from_bytes<R: Read>(mut reader: R) -> io::Result<Self> {
        reader.read_i8()
    }
}

impl WriteToBytes for i8 {
    fn write_to_bytes<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_i8(*self)
    }
}

/// `BOOL8`: a single byte, non-zero is true.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Bool8(pub bool);

impl ReadFromBytes for Bool8 {
    fn read_from_bytes<R: Read>(mut reader: R) -> io::Result<Self> {
        Ok(Bool8(reader.read_u8()? != 0))
    }
}

impl WriteToBytes for Bool8 {
    fn write_to_bytes<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u8(self.0 as u8)
    }
}

impl ReadFromBytes for u16 {
    fn read_from_bytes<R: Read>(mut reader: R) -> io::Result<Self> {
        reader.read_u16::<BE>()
    }
}

impl WriteToBytes for u16 {
    fn write_to_bytes<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u16::<BE>(*self)
    }
}

impl ReadFromBytes for i16 {
    fn read_from_bytes<R: Read>(mut reader: R) -> io::Result<Self> {
        reader.read_i16::<BE>()
    }
}

impl WriteToBytes for i16 {
    fn write_to_bytes<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_i16::<BE>(*self)
    }
}

impl ReadFromBytes for u32 {
    fn read_from_bytes<R: Read>(mut reader: R) -> io::Result<Self> {
        reader.read_u32::<BE>()
    }
}

impl WriteToBytes for u32 {
    fn write_to_bytes<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<BE>(*self)
    }
}

impl ReadFromBytes for i32 {
    fn read_from_bytes<R: Read>(mut reader: R) -> io::Result<Self> {
        reader.read_i32::<BE>()
    }
}

impl WriteToBytes for i32 {
    fn write_to_bytes<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_i32::<BE>(*self)
    }
}

impl ReadFromBytes for String {
    /// Scans forward for a `0x00` terminator. Reading past the end of the
    /// buffer without finding one surfaces as an `UnexpectedEof` I/O error,
    /// which callers map onto [`crate::Error::Truncated`].
    fn read_from_bytes<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut bytes = Vec::new();
        loop {
            match reader.read_u8()? {
                0 => break,
                b => bytes.push(b),
            }
        }
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl WriteToBytes for str {
    fn write_to_bytes<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(self.as_bytes())?;
        writer.write_u8(0)
    }
}

impl WriteToBytes for String {
    fn write_to_bytes<W: Write>(&self, writer: W) -> io::Result<()> {
        self.as_str().write_to_bytes(writer)
    }
}

/// The 10-byte requirement composite that appears throughout ruleset
/// packets: `UINT8 kind; SINT32 value; UINT8 range; BOOL8 survives;
/// BOOL8 present; BOOL8 quiet`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct RequirementRecord {
    /// Requirement kind (e.g. Tech, Gov, …).
    pub kind: u8,
    /// The requirement's value, meaning depends on `kind`.
    pub value: i32,
    /// The range over which the requirement is evaluated.
    pub range: u8,
    /// Whether the requirement keeps being satisfied once it no longer
    /// holds (e.g. after a unit dies).
    pub survives: bool,
    /// Whether the condition must be present (`true`) or absent (`false`).
    pub present: bool,
    /// Whether failing this requirement should be silent in the UI.
    pub quiet: bool,
}

/// Byte width of a [`RequirementRecord`] on the wire.
pub const REQUIREMENT_SIZE_BYTES: usize = 10;

impl ReadFromBytes for RequirementRecord {
    fn read_from_bytes<R: Read>(mut reader: R) -> io::Result<Self> {
        let kind = reader.read_u8()?;
        let value = reader.read_i32::<BE>()?;
        let range = reader.read_u8()?;
        let survives = reader.read_u8()? != 0;
        let present = reader.read_u8()? != 0;
        let quiet = reader.read_u8()? != 0;
        Ok(RequirementRecord { kind, value, range, survives, present, quiet })
    }
}

impl WriteToBytes for RequirementRecord {
    fn write_to_bytes<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u8(self.kind)?;
        writer.write_i32::<BE>(self.value)?;
        writer.write_u8(self.range)?;
        writer.write_u8(self.survives as u8)?;
        writer.write_u8(self.present as u8)?;
        writer.write_u8(self.quiet as u8)?;
        Ok(())
    }
}
