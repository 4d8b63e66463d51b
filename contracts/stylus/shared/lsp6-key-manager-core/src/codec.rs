//! LSP2 `CompactBytesArray` codec.
//!
//! Layout: repeated `u16 length (big-endian) || length bytes`. An empty blob is an empty list.

use alloc::vec::Vec;

/// Errors while decoding (or refusing to encode) a compact bytes array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer than two bytes left where a length prefix was expected.
    TruncatedLength { offset: usize },
    /// A length prefix of zero.
    ZeroLengthElement { offset: usize },
    /// A length prefix running past the end of the buffer.
    Overrun { offset: usize, declared: usize, remaining: usize },
    /// An element whose size is not allowed by the list kind.
    InvalidElementLength { index: usize, len: usize },
    /// An element too large for a `u16` length prefix.
    ElementTooLong(usize),
}

fn read_u16_be(bytes: &[u8], i: &mut usize) -> Result<u16, CodecError> {
    if bytes.len() < *i + 2 {
        return Err(CodecError::TruncatedLength { offset: *i });
    }
    let mut buf = [0u8; 2];
    buf.copy_from_slice(&bytes[*i..*i + 2]);
    *i += 2;
    Ok(u16::from_be_bytes(buf))
}

fn read_slice<'a>(bytes: &'a [u8], i: &mut usize, len: usize) -> Result<&'a [u8], CodecError> {
    let remaining = bytes.len() - *i;
    if remaining < len {
        return Err(CodecError::Overrun {
            offset: *i - 2,
            declared: len,
            remaining,
        });
    }
    let out = &bytes[*i..*i + len];
    *i += len;
    Ok(out)
}

/// Split a compact bytes array into its elements.
pub fn decode_compact_bytes_array(bytes: &[u8]) -> Result<Vec<&[u8]>, CodecError> {
    let mut elements = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let offset = i;
        let len = read_u16_be(bytes, &mut i)? as usize;
        if len == 0 {
            return Err(CodecError::ZeroLengthElement { offset });
        }
        elements.push(read_slice(bytes, &mut i, len)?);
    }

    Ok(elements)
}

/// Encode elements into a compact bytes array.
///
/// Refuses elements that the decoder would reject (empty, or longer than `u16::MAX`).
pub fn encode_compact_bytes_array<T: AsRef<[u8]>>(elements: &[T]) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    for element in elements {
        let element = element.as_ref();
        if element.is_empty() {
            return Err(CodecError::ZeroLengthElement { offset: buf.len() });
        }
        let len = u16::try_from(element.len()).map_err(|_| CodecError::ElementTooLong(element.len()))?;
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(element);
    }
    Ok(buf)
}
