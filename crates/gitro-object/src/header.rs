//! The `"<type> <size>\0"` framing that prefixes every serialized object.

use bstr::ByteSlice;

use crate::{ObjectError, ObjectType};

/// Split the framing off the front of serialized object bytes.
///
/// Returns the declared type, the declared payload size, and how many
/// bytes the framing occupies (terminator included); the payload starts
/// right after.
pub fn parse_header(data: &[u8]) -> Result<(ObjectType, usize, usize), ObjectError> {
    let terminator = data
        .find_byte(0)
        .ok_or_else(|| ObjectError::InvalidHeader("unterminated framing".into()))?;

    let (type_bytes, size_bytes) = data[..terminator]
        .split_once_str(" ")
        .ok_or_else(|| ObjectError::InvalidHeader("framing lacks a size field".into()))?;

    let obj_type = ObjectType::from_bytes(type_bytes)?;
    let size = parse_decimal(size_bytes).ok_or_else(|| {
        ObjectError::InvalidHeader(format!(
            "bad size field: {:?}",
            String::from_utf8_lossy(size_bytes)
        ))
    })?;

    Ok((obj_type, size, terminator + 1))
}

/// Emit the framing for a payload of `content_size` bytes.
pub fn write_header(obj_type: ObjectType, content_size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(obj_type.as_bytes());
    out.push(b' ');
    out.extend_from_slice(content_size.to_string().as_bytes());
    out.push(0);
    out
}

/// Overflow-checked ASCII decimal. Rejects empty input and any non-digit.
fn parse_decimal(digits: &[u8]) -> Option<usize> {
    if digits.is_empty() {
        return None;
    }
    let mut value = 0usize;
    for &d in digits {
        if !d.is_ascii_digit() {
            return None;
        }
        value = value
            .checked_mul(10)?
            .checked_add(usize::from(d - b'0'))?;
    }
    Some(value)
}
