//! Fixed-size primitives and byte order.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Byte order of multi-byte values in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Endian {
    /// Little-endian (NIFL family).
    #[default]
    Little,
    /// Big-endian (ARC family).
    Big,
}

impl std::fmt::Display for Endian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endian::Little => write!(f, "little-endian"),
            Endian::Big => write!(f, "big-endian"),
        }
    }
}

/// A value with a fixed encoded size that can be read from or written to a buffer.
pub trait Primitive: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Decode from exactly `SIZE` bytes.
    fn decode(bytes: &[u8], endian: Endian) -> Self;

    /// Append the encoded value to `out`.
    fn encode(&self, endian: Endian, out: &mut Vec<u8>);
}

macro_rules! impl_primitive {
    ($($ty:ty, $size:expr, $read:ident, $write:ident;)*) => {
        $(
            impl Primitive for $ty {
                const SIZE: usize = $size;

                fn decode(bytes: &[u8], endian: Endian) -> Self {
                    match endian {
                        Endian::Little => LittleEndian::$read(bytes),
                        Endian::Big => BigEndian::$read(bytes),
                    }
                }

                fn encode(&self, endian: Endian, out: &mut Vec<u8>) {
                    let mut buf = [0u8; $size];
                    match endian {
                        Endian::Little => LittleEndian::$write(&mut buf, *self),
                        Endian::Big => BigEndian::$write(&mut buf, *self),
                    }
                    out.extend_from_slice(&buf);
                }
            }
        )*
    };
}

impl_primitive! {
    u16, 2, read_u16, write_u16;
    i16, 2, read_i16, write_i16;
    u32, 4, read_u32, write_u32;
    i32, 4, read_i32, write_i32;
    u64, 8, read_u64, write_u64;
    i64, 8, read_i64, write_i64;
    f32, 4, read_f32, write_f32;
    f64, 8, read_f64, write_f64;
}

impl Primitive for u8 {
    const SIZE: usize = 1;

    fn decode(bytes: &[u8], _endian: Endian) -> Self {
        bytes[0]
    }

    fn encode(&self, _endian: Endian, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl Primitive for i8 {
    const SIZE: usize = 1;

    fn decode(bytes: &[u8], _endian: Endian) -> Self {
        bytes[0] as i8
    }

    fn encode(&self, _endian: Endian, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }
}

// Raw byte groups (colors, opaque payloads) are stored as-is in either byte order.
impl<const N: usize> Primitive for [u8; N] {
    const SIZE: usize = N;

    fn decode(bytes: &[u8], _endian: Endian) -> Self {
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes[..N]);
        out
    }

    fn encode(&self, _endian: Endian, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }
}

fn decode_floats<const N: usize>(bytes: &[u8], endian: Endian) -> [f32; N] {
    let mut out = [0f32; N];
    for (i, value) in out.iter_mut().enumerate() {
        *value = f32::decode(&bytes[i * 4..i * 4 + 4], endian);
    }
    out
}

fn encode_floats(values: &[f32], endian: Endian, out: &mut Vec<u8>) {
    for value in values {
        value.encode(endian, out);
    }
}

impl Primitive for Vec2 {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8], endian: Endian) -> Self {
        Vec2::from_array(decode_floats::<2>(bytes, endian))
    }

    fn encode(&self, endian: Endian, out: &mut Vec<u8>) {
        encode_floats(&self.to_array(), endian, out);
    }
}

impl Primitive for Vec3 {
    const SIZE: usize = 12;

    fn decode(bytes: &[u8], endian: Endian) -> Self {
        Vec3::from_array(decode_floats::<3>(bytes, endian))
    }

    fn encode(&self, endian: Endian, out: &mut Vec<u8>) {
        encode_floats(&self.to_array(), endian, out);
    }
}

impl Primitive for Vec4 {
    const SIZE: usize = 16;

    fn decode(bytes: &[u8], endian: Endian) -> Self {
        Vec4::from_array(decode_floats::<4>(bytes, endian))
    }

    fn encode(&self, endian: Endian, out: &mut Vec<u8>) {
        encode_floats(&self.to_array(), endian, out);
    }
}

/// Matrices are stored as four consecutive columns.
impl Primitive for Mat4 {
    const SIZE: usize = 64;

    fn decode(bytes: &[u8], endian: Endian) -> Self {
        Mat4::from_cols_array(&decode_floats::<16>(bytes, endian))
    }

    fn encode(&self, endian: Endian, out: &mut Vec<u8>) {
        encode_floats(&self.to_cols_array(), endian, out);
    }
}
