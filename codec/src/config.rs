//! Limits applied while reading untrusted input.

use core::ops::{Bound, RangeBounds};

/// Configuration for limiting the range of a value read from the stream.
///
/// # Examples
///
/// ```
/// use bitwire_codec::RangeCfg;
///
/// let cfg = RangeCfg::new(1..=64u32);
/// assert!(cfg.contains(&64));
/// assert!(!cfg.contains(&0));
///
/// let unbounded: RangeCfg<usize> = (..).into();
/// assert!(unbounded.contains(&usize::MAX));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RangeCfg<T: Copy + PartialOrd> {
    /// The lower bound of the range.
    start: Bound<T>,

    /// The upper bound of the range.
    end: Bound<T>,
}

macro_rules! impl_from_range {
    ($($range:ty),*) => {
        $(
            impl<T: Copy + PartialOrd> From<$range> for RangeCfg<T> {
                fn from(r: $range) -> Self {
                    Self::new(r)
                }
            }
        )*
    };
}

impl_from_range!(
    core::ops::Range<T>,
    core::ops::RangeInclusive<T>,
    core::ops::RangeFrom<T>,
    core::ops::RangeTo<T>,
    core::ops::RangeToInclusive<T>
);

impl<T: Copy + PartialOrd> From<core::ops::RangeFull> for RangeCfg<T> {
    fn from(_: core::ops::RangeFull) -> Self {
        Self::new(..)
    }
}

impl<T: Copy + PartialOrd> Default for RangeCfg<T> {
    fn default() -> Self {
        Self::new(..)
    }
}

impl<T: Copy + PartialOrd> RangeCfg<T> {
    /// Creates a new `RangeCfg` from any type implementing `RangeBounds<T>`.
    pub fn new(r: impl RangeBounds<T>) -> Self {
        RangeCfg {
            start: r.start_bound().cloned(),
            end: r.end_bound().cloned(),
        }
    }

    /// Returns true if the value is within this range.
    pub fn contains(&self, value: &T) -> bool {
        (self.start, self.end).contains(value)
    }
}

/// Configuration of a [crate::Deserializer].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Allowed values for counts read with [crate::Deserializer::dynamic_count].
    pub dynamic_count: RangeCfg<u32>,

    /// Allowed lengths for strings read with [crate::Deserializer::read_string].
    pub string_length: RangeCfg<usize>,
}
