//! Primitive encoding for persisted entries
//!
//! Strings are an `i32` byte length followed by UTF-8 bytes, booleans a
//! single byte, integers big endian.

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{malformed, PrivError, Result};

/// Upper bound on a decoded string, guards against corrupt lengths
const MAX_STRING_LEN: usize = 1 << 20;

pub fn write_string<W: Write>(w: &mut W, s: &str) -> Result<()> {
    let len = i32::try_from(s.len()).map_err(|_| PrivError::Malformed(format!("string of {} bytes too long", s.len())))?;
    w.write_i32::<BigEndian>(len)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

pub fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = r.read_i32::<BigEndian>().map_err(malformed)?;
    let len = usize::try_from(len).map_err(|_| PrivError::Malformed(format!("negative string length {}", len)))?;
    if len > MAX_STRING_LEN {
        return Err(PrivError::Malformed(format!("string length {} exceeds limit", len)));
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(malformed)?;
    String::from_utf8(buf).map_err(|e| PrivError::Malformed(e.to_string()))
}

pub fn write_bool<W: Write>(w: &mut W, b: bool) -> Result<()> {
    w.write_u8(b as u8)?;
    Ok(())
}

pub fn read_bool<R: Read>(r: &mut R) -> Result<bool> {
    match r.read_u8().map_err(malformed)? {
        0 => Ok(false),
        1 => Ok(true),
        b => Err(PrivError::Malformed(format!("invalid boolean byte {}", b))),
    }
}

pub fn write_count<W: Write>(w: &mut W, n: usize) -> Result<()> {
    let n = i32::try_from(n).map_err(|_| PrivError::Malformed(format!("count {} too large", n)))?;
    w.write_i32::<BigEndian>(n)?;
    Ok(())
}

pub fn read_count<R: Read>(r: &mut R) -> Result<usize> {
    let n = r.read_i32::<BigEndian>().map_err(malformed)?;
    usize::try_from(n).map_err(|_| PrivError::Malformed(format!("negative count {}", n)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_layout() {
        let mut buf = Vec::new();
        write_string(&mut buf, "ab").unwrap();
        assert_eq!(buf, vec![0, 0, 0, 2, b'a', b'b']);
        assert_eq!(read_string(&mut buf.as_slice()).unwrap(), "ab");
    }

    #[test]
    fn test_truncated_string() {
        let buf = vec![0, 0, 0, 5, b'a'];
        assert!(matches!(read_string(&mut buf.as_slice()), Err(PrivError::Malformed(_))));
        assert!(matches!(read_string(&mut &buf[..2]), Err(PrivError::Malformed(_))));
    }

    #[test]
    fn test_negative_length() {
        let buf = (-1i32).to_be_bytes();
        assert!(matches!(read_string(&mut &buf[..]), Err(PrivError::Malformed(_))));
    }

    #[test]
    fn test_invalid_utf8() {
        let buf = vec![0, 0, 0, 1, 0xff];
        assert!(matches!(read_string(&mut buf.as_slice()), Err(PrivError::Malformed(_))));
    }

    #[test]
    fn test_bool() {
        let mut buf = Vec::new();
        write_bool(&mut buf, true).unwrap();
        write_bool(&mut buf, false).unwrap();
        assert_eq!(buf, vec![1, 0]);
        let mut r = buf.as_slice();
        assert!(read_bool(&mut r).unwrap());
        assert!(!read_bool(&mut r).unwrap());
        assert!(read_bool(&mut r).is_err());
        assert!(read_bool(&mut &[7u8][..]).is_err());
    }
}
