//! Fixed-width primitive types that can be read from a bit stream.
//!
//! Multi-byte values are assembled from consecutive 8-bit reads in little-endian byte order,
//! regardless of the alignment of the cursor. `bool` is the exception: it is a single bit.

use crate::{cursor::Cursor, DataType};

mod sealed {
    pub trait Sealed {}
}

/// A primitive value with a fixed wire width and a [DataType] tag.
///
/// This trait is sealed: the set of primitives is fixed by the wire format.
pub trait Primitive: Copy + sealed::Sealed {
    /// Type tag a template field must carry for this primitive to be read from it.
    const TYPE: DataType;

    /// Number of bits the value occupies on the wire.
    const BITS: usize = Self::TYPE.bits();

    /// Reads the value from `cursor`.
    ///
    /// The caller must have checked that at least [Primitive::BITS] bits are left.
    #[doc(hidden)]
    fn take(cursor: &mut Cursor<'_>) -> Self;
}

macro_rules! impl_primitive {
    ($type:ty, $tag:ident) => {
        impl sealed::Sealed for $type {}

        impl Primitive for $type {
            const TYPE: DataType = DataType::$tag;

            #[inline]
            fn take(cursor: &mut Cursor<'_>) -> Self {
                let mut bytes = [0u8; std::mem::size_of::<$type>()];
                for byte in bytes.iter_mut() {
                    *byte = cursor.take_byte();
                }
                <$type>::from_le_bytes(bytes)
            }
        }
    };
}

impl_primitive!(u8, U8);
impl_primitive!(i8, S8);
impl_primitive!(u16, U16);
impl_primitive!(i16, S16);
impl_primitive!(u32, U32);
impl_primitive!(i32, S32);
impl_primitive!(u64, U64);
impl_primitive!(i64, S64);
impl_primitive!(f32, F32);
impl_primitive!(f64, F64);

impl sealed::Sealed for bool {}

impl Primitive for bool {
    const TYPE: DataType = DataType::Bit;

    #[inline]
    fn take(cursor: &mut Cursor<'_>) -> Self {
        cursor.take_bits(1) != 0
    }
}
