//! Binary cursor helpers shared by the resource, overlay and project readers
//!
//! Everything is little-endian. Strings come in two shapes: sized (an `i32`
//! length followed by raw UTF-8) and null-terminated.

use std::io::{BufRead, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// Bytes left between the cursor position and the end of its buffer
#[must_use]
pub fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    let len = cursor.get_ref().len();
    let pos = usize::try_from(cursor.position()).unwrap_or(len);
    len.saturating_sub(pos)
}

/// Read exactly `len` bytes, failing before allocating if the buffer is shorter
pub fn read_bytes(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    if len > remaining(cursor) {
        return Err(Error::UnexpectedEof);
    }
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf)?;
    Ok(buf)
}

/// Skip `len` bytes
pub fn skip(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<()> {
    if len > remaining(cursor) {
        return Err(Error::UnexpectedEof);
    }
    cursor.set_position(cursor.position() + len as u64);
    Ok(())
}

/// Skip an `i32` length-prefixed blob (non-positive lengths carry no data)
pub fn skip_sized_blob(cursor: &mut Cursor<&[u8]>) -> Result<()> {
    let size = cursor.read_i32::<LittleEndian>()?;
    if size > 0 {
        skip(cursor, size as usize)?;
    }
    Ok(())
}

/// Read a sized UTF-8 string of `len` bytes; invalid sequences are replaced
pub fn read_sized_string(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<String> {
    let bytes = read_bytes(cursor, len)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write an `i32` length followed by the UTF-8 bytes of `s`
pub fn write_sized_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer.write_i32::<LittleEndian>(s.len() as i32)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

/// Read a null-terminated UTF-8 string
pub fn read_null_terminated_string<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut buf = Vec::new();
    reader.read_until(0, &mut buf)?;
    if buf.pop() != Some(0) {
        return Err(Error::UnexpectedEof);
    }
    Ok(String::from_utf8(buf)?)
}

/// Write `s` followed by a null terminator
///
/// # Errors
/// Returns [`Error::InvalidString`] if `s` itself contains a null character.
pub fn write_null_terminated_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    if s.contains('\0') {
        return Err(Error::InvalidString(format!(
            "cannot null-terminate a string containing NUL: {s:?}"
        )));
    }
    writer.write_all(s.as_bytes())?;
    writer.write_u8(0)?;
    Ok(())
}

/// Read a .NET-style boolean (one byte, non-zero is true)
pub fn read_bool<R: Read>(reader: &mut R) -> Result<bool> {
    Ok(reader.read_u8()? != 0)
}

/// Read a 16-byte GUID in its on-disk byte order
pub fn read_guid<R: Read>(reader: &mut R) -> Result<[u8; 16]> {
    let mut guid = [0u8; 16];
    reader.read_exact(&mut guid)?;
    Ok(guid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_terminated_roundtrip() {
        let mut buf = Vec::new();
        write_null_terminated_string(&mut buf, "Grüße").unwrap();
        write_null_terminated_string(&mut buf, "").unwrap();

        let mut cursor = Cursor::new(buf.as_slice());
        assert_eq!(read_null_terminated_string(&mut cursor).unwrap(), "Grüße");
        assert_eq!(read_null_terminated_string(&mut cursor).unwrap(), "");
        assert_eq!(remaining(&cursor), 0);
    }

    #[test]
    fn test_null_terminated_rejects_embedded_nul() {
        let mut buf = Vec::new();
        let result = write_null_terminated_string(&mut buf, "a\0b");

        assert!(matches!(result, Err(Error::InvalidString(_))));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_null_terminated_missing_terminator() {
        let data = b"abc";
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            read_null_terminated_string(&mut cursor),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn test_read_bytes_past_end() {
        let data = [1u8, 2, 3];
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(read_bytes(&mut cursor, 4), Err(Error::UnexpectedEof)));
        // Failed read must not move the cursor
        assert_eq!(read_bytes(&mut cursor, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_sized_string() {
        let mut buf = Vec::new();
        write_sized_string(&mut buf, "Hello").unwrap();
        assert_eq!(&buf[..4], &5i32.to_le_bytes());

        let mut cursor = Cursor::new(&buf[4..]);
        assert_eq!(read_sized_string(&mut cursor, 5).unwrap(), "Hello");
    }
}
