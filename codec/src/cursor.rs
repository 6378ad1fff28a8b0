//! Bit-level read cursor over a borrowed byte buffer.
//!
//! Bits are consumed least-significant-bit first within each byte: the first bit read from
//! `0b1011_0010` is `0`, the second is `1`, and so on. A multi-bit read packs the bits it
//! consumes into the low bits of the result in the order they were read, so reading 3 bits and
//! then 5 bits from that byte yields `0b010` and `0b10110`.
//!
//! The cursor never reads past the end of its buffer: every fallible operation checks the
//! number of bits left first and returns [Error::EndOfBuffer] without moving.

use crate::Error;

/// Number of bits in a byte.
pub const BITS_PER_BYTE: usize = u8::BITS as usize;

/// Maximum number of bits that can be read at once with [Cursor::read_bits].
pub const MAX_READ_BITS: u32 = u32::BITS;

/// Read position within a borrowed byte buffer.
///
/// The cursor is `Copy` so callers can snapshot it before a multi-step read and restore it if a
/// later step fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor<'a> {
    /// The buffer being read.
    data: &'a [u8],
    /// The byte that will be read next.
    byte: usize,
    /// The bit within `byte` that will be read next, in `[0, 7]`.
    bit: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor positioned at the first bit of `data`.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte: 0,
            bit: 0,
        }
    }

    /// Returns the full underlying buffer.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Moves the cursor back to the first bit of the buffer.
    #[inline]
    pub fn reset(&mut self) {
        self.byte = 0;
        self.bit = 0;
    }

    /// Returns the index of the byte that will be read next.
    #[inline]
    pub fn byte_pos(&self) -> usize {
        self.byte
    }

    /// Returns the index, in `[0, 7]`, of the bit within the current byte that will be read next.
    #[inline]
    pub fn bit_pos(&self) -> usize {
        self.bit
    }

    /// Returns the number of bytes left to read.
    ///
    /// A partially consumed byte still counts as left.
    #[inline]
    pub fn bytes_left(&self) -> usize {
        self.data.len().saturating_sub(self.byte)
    }

    /// Returns the number of bits left to read.
    #[inline]
    pub fn bits_left(&self) -> usize {
        if self.byte >= self.data.len() {
            return 0;
        }
        (self.data.len() - self.byte) * BITS_PER_BYTE - self.bit
    }

    /// Returns the buffer from the current byte onwards.
    #[inline]
    pub fn current_data(&self) -> &'a [u8] {
        &self.data[self.byte.min(self.data.len())..]
    }

    /// Returns an error if fewer than `bits` bits are left.
    #[inline]
    pub fn require(&self, bits: usize) -> Result<(), Error> {
        if self.bits_left() < bits {
            return Err(Error::EndOfBuffer);
        }
        Ok(())
    }

    /// Reads `num_bits` bits, in `[1, 32]`, and packs them into the low bits of a `u32`.
    pub fn read_bits(&mut self, num_bits: u32) -> Result<u32, Error> {
        if num_bits == 0 || num_bits > MAX_READ_BITS {
            return Err(Error::InvalidBitCount(num_bits));
        }
        self.require(num_bits as usize)?;
        Ok(self.take_bits(num_bits))
    }

    /// Advances the cursor by `num_bits` bits without producing a value.
    pub fn skip_bits(&mut self, num_bits: usize) -> Result<(), Error> {
        self.require(num_bits)?;
        let target = self.byte * BITS_PER_BYTE + self.bit + num_bits;
        self.byte = target / BITS_PER_BYTE;
        self.bit = target % BITS_PER_BYTE;
        Ok(())
    }

    /// Reads `num_bits` bits, in `[1, 32]`.
    ///
    /// The caller must have checked that enough bits are left (see [Cursor::require]).
    pub(crate) fn take_bits(&mut self, num_bits: u32) -> u32 {
        let mut value = 0u32;
        let mut filled = 0u32;
        while filled < num_bits {
            // Take as many bits as possible from the current byte
            let available = (BITS_PER_BYTE - self.bit) as u32;
            let take = available.min(num_bits - filled);
            let chunk = u32::from(self.data[self.byte] >> self.bit) & low_mask(take);
            value |= chunk << filled;
            filled += take;

            // Move to the next byte once this one is exhausted
            self.bit += take as usize;
            if self.bit == BITS_PER_BYTE {
                self.bit = 0;
                self.byte += 1;
            }
        }
        value
    }

    /// Reads the next 8 bits as a byte.
    ///
    /// The caller must have checked that enough bits are left (see [Cursor::require]).
    #[inline]
    pub(crate) fn take_byte(&mut self) -> u8 {
        if self.bit == 0 {
            let byte = self.data[self.byte];
            self.byte += 1;
            return byte;
        }
        self.take_bits(8) as u8
    }
}

/// Returns a mask covering the low `bits` bits of a `u32`.
#[inline]
pub(crate) fn low_mask(bits: u32) -> u32 {
    if bits >= u32::BITS {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}
