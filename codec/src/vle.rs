//! Three-tier variable-length integer (VLE) decoding
//!
//! A VLE format is described by three bit widths `(B1, B2, B3)`:
//! - Tier 1 holds `B1` value bits followed by 1 continuation bit.
//! - If that continuation bit is set, tier 2 holds `B2` more value bits, followed by 1
//!   continuation bit only if `B3 > 0`.
//! - If the tier 2 continuation bit is set, tier 3 holds the final `B3` value bits.
//!
//! The decoded value is `tier1 | tier2 << B1 | tier3 << (B1 + B2)`. Small values cost
//! `B1 + 1` bits, while values up to `B1 + B2 + B3` bits wide remain representable.
//!
//! Unlike byte-oriented varints, tiers are not aligned: the format is read through the bit
//! cursor and may start and end anywhere within a byte.

use crate::{
    cursor::{low_mask, Cursor},
    Error,
};

/// Legacy sentinel for an exhausted stream.
///
/// It is indistinguishable from a legitimately encoded `u32::MAX`, so readers report
/// exhaustion with [Error::EndOfBuffer] instead.
pub const VLE_READ_ERROR: u32 = u32::MAX;

/// Bit widths of the three tiers of a VLE format.
pub trait VleFormat {
    /// Value bits of the first tier.
    const BITS1: u32;
    /// Value bits of the second tier.
    const BITS2: u32;
    /// Value bits of the third tier (`0` if the format only has two tiers).
    const BITS3: u32;

    /// Widest value the format can hold, in bits.
    const MAX_BITS: u32 = Self::BITS1 + Self::BITS2 + Self::BITS3;

    /// Evaluated whenever the format is used, rejecting impossible widths at compile time.
    #[doc(hidden)]
    const VALID: () = assert!(
        Self::BITS1 >= 1
            && Self::BITS1 < u32::BITS
            && Self::BITS2 >= 1
            && Self::BITS1 + Self::BITS2 + Self::BITS3 <= u32::BITS
            && (Self::BITS3 == 0 || Self::BITS1 + Self::BITS2 < u32::BITS),
        "invalid VLE tier widths"
    );
}

/// A VLE format with tier widths given as const parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Vle<const B1: u32, const B2: u32, const B3: u32 = 0>;

impl<const B1: u32, const B2: u32, const B3: u32> VleFormat for Vle<B1, B2, B3> {
    const BITS1: u32 = B1;
    const BITS2: u32 = B2;
    const BITS3: u32 = B3;
}

/// 1 byte for values below 2^7, 2 bytes for values below 2^15.
pub type Vle8_16 = Vle<7, 8>;

/// 1 byte for values below 2^7, 4 bytes for values below 2^31.
pub type Vle8_32 = Vle<7, 24>;

/// 2 bytes for values below 2^15, 4 bytes for values below 2^31.
pub type Vle16_32 = Vle<15, 16>;

/// 1 byte for values below 2^7, 2 bytes below 2^14, 4 bytes below 2^30.
pub type Vle8_16_32 = Vle<7, 7, 16>;

/// Decodes a value in format `V`.
///
/// If the stream runs out part-way through, returns [Error::EndOfBuffer] and leaves the cursor
/// where it was before the call.
pub fn read<V: VleFormat>(cursor: &mut Cursor<'_>) -> Result<u32, Error> {
    #[allow(clippy::let_unit_value)]
    let () = V::VALID;

    let start = *cursor;
    let result = read_tiers::<V>(cursor);
    if result.is_err() {
        *cursor = start;
    }
    result
}

fn read_tiers<V: VleFormat>(cursor: &mut Cursor<'_>) -> Result<u32, Error> {
    // First tier
    let small = cursor.read_bits(V::BITS1 + 1)?;
    if small & (1 << V::BITS1) == 0 {
        return Ok(small);
    }
    let small = small & low_mask(V::BITS1);

    // Second tier (only carries a continuation bit if a third tier exists)
    let medium_bits = V::BITS2 + u32::from(V::BITS3 > 0);
    let medium = cursor.read_bits(medium_bits)?;
    if V::BITS3 == 0 || medium & (1 << V::BITS2) == 0 {
        return Ok(small | (medium << V::BITS1));
    }
    let medium = medium & low_mask(V::BITS2);

    // Third tier
    let large = cursor.read_bits(V::BITS3)?;
    Ok(small | (medium << V::BITS1) | (large << (V::BITS1 + V::BITS2)))
}

/// Returns the number of bits `value` occupies when encoded in format `V`, or `None` if the
/// value is too wide for the format.
pub fn size<V: VleFormat>(value: u32) -> Option<usize> {
    #[allow(clippy::let_unit_value)]
    let () = V::VALID;

    let fits = |bits: u32| bits >= u32::BITS || value < (1u32 << bits);
    let tier1 = V::BITS1 + 1;
    if fits(V::BITS1) {
        return Some(tier1 as usize);
    }
    let tier2 = tier1 + V::BITS2 + u32::from(V::BITS3 > 0);
    if fits(V::BITS1 + V::BITS2) {
        return Some(tier2 as usize);
    }
    if V::BITS3 > 0 && fits(V::MAX_BITS) {
        return Some((tier2 + V::BITS3) as usize);
    }
    None
}
