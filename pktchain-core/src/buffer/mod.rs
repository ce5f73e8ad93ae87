//! Bounds-checked byte buffer primitives.
//!
//! Every header field in the decoders and serializers goes through these
//! helpers. An access is valid only when `len > 0` and
//! `offset + len <= buffer.len()`; anything else is a [`BufferError`], and a
//! zero-length access is rejected rather than treated as a no-op.
//!
//! Integers default to big-endian (network order). Little-endian is needed
//! for a handful of host-order fields such as the BSD loopback family.

pub mod address;
pub mod checksum;
pub mod hex;

pub use address::{
    read_ipv4, read_ipv6, read_link_addr, read_mac, write_ipv4, write_ipv6, write_link_addr,
    write_mac, LinkLayerAddress, MacAddr,
};

use crate::error::BufferError;

/// Byte order of a multi-byte integer field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Network byte order
    #[default]
    Big,
    /// Host order on every capture platform that matters
    Little,
}

/// Validate an access of `len` bytes at `offset` into a buffer of `buffer_len` bytes.
#[inline]
pub fn check_bounds(buffer_len: usize, offset: usize, len: usize) -> Result<(), BufferError> {
    if len == 0 {
        return Err(BufferError::ZeroLength { offset });
    }
    match offset.checked_add(len) {
        Some(end) if end <= buffer_len => Ok(()),
        _ => Err(BufferError::OutOfBounds {
            offset,
            len,
            buffer_len,
        }),
    }
}

/// Borrow `len` bytes at `offset`.
#[inline]
pub fn read_bytes(data: &[u8], offset: usize, len: usize) -> Result<&[u8], BufferError> {
    check_bounds(data.len(), offset, len)?;
    Ok(&data[offset..offset + len])
}

/// Copy `src` into `buf` at `offset`.
#[inline]
pub fn write_bytes(buf: &mut [u8], offset: usize, src: &[u8]) -> Result<(), BufferError> {
    check_bounds(buf.len(), offset, src.len())?;
    buf[offset..offset + src.len()].copy_from_slice(src);
    Ok(())
}

#[inline]
fn read_array<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], BufferError> {
    let mut out = [0u8; N];
    out.copy_from_slice(read_bytes(data, offset, N)?);
    Ok(out)
}

#[inline]
pub fn read_u8(data: &[u8], offset: usize) -> Result<u8, BufferError> {
    check_bounds(data.len(), offset, 1)?;
    Ok(data[offset])
}

#[inline]
pub fn write_u8(buf: &mut [u8], offset: usize, value: u8) -> Result<(), BufferError> {
    check_bounds(buf.len(), offset, 1)?;
    buf[offset] = value;
    Ok(())
}

macro_rules! int_accessors {
    ($($read:ident, $write:ident => $ty:ty;)*) => {
        $(
            #[inline]
            pub fn $read(data: &[u8], offset: usize, order: ByteOrder) -> Result<$ty, BufferError> {
                let raw = read_array(data, offset)?;
                Ok(match order {
                    ByteOrder::Big => <$ty>::from_be_bytes(raw),
                    ByteOrder::Little => <$ty>::from_le_bytes(raw),
                })
            }

            #[inline]
            pub fn $write(
                buf: &mut [u8],
                offset: usize,
                value: $ty,
                order: ByteOrder,
            ) -> Result<(), BufferError> {
                let raw = match order {
                    ByteOrder::Big => value.to_be_bytes(),
                    ByteOrder::Little => value.to_le_bytes(),
                };
                write_bytes(buf, offset, &raw)
            }
        )*
    };
}

int_accessors! {
    read_u16, write_u16 => u16;
    read_u32, write_u32 => u32;
    read_u64, write_u64 => u64;
}

/// Big-endian u16 at `offset`, the common case for header fields.
#[inline]
pub fn read_be16(data: &[u8], offset: usize) -> Result<u16, BufferError> {
    read_u16(data, offset, ByteOrder::Big)
}

/// Big-endian u32 at `offset`.
#[inline]
pub fn read_be32(data: &[u8], offset: usize) -> Result<u32, BufferError> {
    read_u32(data, offset, ByteOrder::Big)
}

/// Concatenate byte slices into one owned buffer.
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

/// Byte-wise XOR of two equally long slices.
pub fn xor(left: &[u8], right: &[u8]) -> Result<Vec<u8>, BufferError> {
    if left.len() != right.len() {
        return Err(BufferError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    Ok(left.iter().zip(right).map(|(a, b)| a ^ b).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_round_trip_both_orders() {
        let mut buf = [0u8; 32];
        for order in [ByteOrder::Big, ByteOrder::Little] {
            write_u8(&mut buf, 0, 0xAB).unwrap();
            write_u16(&mut buf, 1, 0xBEEF, order).unwrap();
            write_u32(&mut buf, 3, 0xDEAD_BEEF, order).unwrap();
            write_u64(&mut buf, 7, 0x0123_4567_89AB_CDEF, order).unwrap();

            assert_eq!(read_u8(&buf, 0).unwrap(), 0xAB);
            assert_eq!(read_u16(&buf, 1, order).unwrap(), 0xBEEF);
            assert_eq!(read_u32(&buf, 3, order).unwrap(), 0xDEAD_BEEF);
            assert_eq!(read_u64(&buf, 7, order).unwrap(), 0x0123_4567_89AB_CDEF);
        }
    }

    #[test]
    fn test_byte_order_layout() {
        let mut buf = [0u8; 4];
        write_u32(&mut buf, 0, 0x0102_0304, ByteOrder::Big).unwrap();
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
        write_u32(&mut buf, 0, 0x0102_0304, ByteOrder::Little).unwrap();
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(ByteOrder::default(), ByteOrder::Big);
    }

    #[test]
    fn test_out_of_bounds() {
        let buf = [0u8; 4];
        assert_eq!(
            read_u32(&buf, 1, ByteOrder::Big),
            Err(BufferError::OutOfBounds {
                offset: 1,
                len: 4,
                buffer_len: 4
            })
        );
        assert!(read_u8(&buf, 4).is_err());
        assert!(read_bytes(&buf, usize::MAX, 2).is_err());
    }

    #[test]
    fn test_zero_length_rejected() {
        let buf = [0u8; 4];
        assert_eq!(
            read_bytes(&buf, 0, 0),
            Err(BufferError::ZeroLength { offset: 0 })
        );
        let mut out = [0u8; 4];
        assert_eq!(
            write_bytes(&mut out, 2, &[]),
            Err(BufferError::ZeroLength { offset: 2 })
        );
    }

    #[test]
    fn test_concat_and_xor() {
        assert_eq!(concat(&[&[1, 2], &[], &[3]]), vec![1, 2, 3]);
        assert_eq!(xor(&[0xF0, 0x0F], &[0xFF, 0xFF]).unwrap(), vec![0x0F, 0xF0]);
        assert_eq!(
            xor(&[1], &[1, 2]),
            Err(BufferError::LengthMismatch { left: 1, right: 2 })
        );
    }
}
