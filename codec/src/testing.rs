//! Bit-packed fixture writer mirroring the layout the deserializer expects.

use crate::vle::VleFormat;
use bytes::{BufMut, BytesMut};
use paste::paste;

/// Writes values LSB-first into a growing buffer.
#[derive(Default)]
pub struct BitWriter {
    buf: BytesMut,
    /// Bits already used in the last byte of `buf` (0 if the last byte is full).
    bit: u32,
}

macro_rules! impl_put {
    ($($type:ty),*) => {
        paste! {
            $(
                pub fn [<put_ $type>](&mut self, value: $type) {
                    for byte in value.to_le_bytes() {
                        self.write_bits(u32::from(byte), 8);
                    }
                }
            )*
        }
    };
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the low `num_bits` bits of `value`.
    pub fn write_bits(&mut self, value: u32, num_bits: u32) {
        for i in 0..num_bits {
            if self.bit == 0 {
                self.buf.put_u8(0);
            }
            if (value >> i) & 1 == 1 {
                let last = self.buf.len() - 1;
                self.buf[last] |= 1 << self.bit;
            }
            self.bit = (self.bit + 1) % 8;
        }
    }

    impl_put!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

    pub fn put_bool(&mut self, value: bool) {
        self.write_bits(u32::from(value), 1);
    }

    /// Appends `value` in VLE format `V`.
    pub fn write_vle<V: VleFormat>(&mut self, value: u32) {
        let tier1 = V::BITS1;
        let tier2 = V::BITS1 + V::BITS2;
        if u64::from(value) < 1u64 << tier1 {
            self.write_bits(value, tier1 + 1);
            return;
        }
        self.write_bits(value, tier1);
        self.write_bits(1, 1);
        let medium = value >> tier1;
        if V::BITS3 == 0 || u64::from(value) < 1u64 << tier2 {
            self.write_bits(medium, V::BITS2);
            if V::BITS3 > 0 {
                self.write_bits(0, 1);
            }
            return;
        }
        self.write_bits(medium, V::BITS2);
        self.write_bits(1, 1);
        self.write_bits(value >> tier2, V::BITS3);
    }

    /// Appends a length byte followed by the raw bytes of `value`.
    pub fn write_string(&mut self, value: &[u8]) {
        self.put_u8(value.len() as u8);
        for byte in value {
            self.put_u8(*byte);
        }
    }

    /// Returns the written bytes, padding the last byte with zeros.
    pub fn finish(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bits() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b010, 3);
        writer.write_bits(0b10110, 5);
        writer.write_bits(1, 1);
        assert_eq!(writer.finish(), vec![0b1011_0010, 0b0000_0001]);
    }
}
