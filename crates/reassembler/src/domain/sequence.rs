//! # Sequence Values
//!
//! The ordered key carried by every reassembled item.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A totally-ordered, fixed-width integer usable as a sequence key.
///
/// Wraparound is not handled: the sequence domain is assumed large enough
/// not to wrap during the lifetime of a reassembler.
pub trait SequenceValue:
    Copy + Ord + Hash + Debug + Display + Send + Sync + 'static
{
    /// The value immediately after `self`, or `None` at the top of the domain.
    fn successor(self) -> Option<Self>;
}

macro_rules! impl_sequence_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SequenceValue for $ty {
                #[inline]
                fn successor(self) -> Option<Self> {
                    self.checked_add(1)
                }
            }
        )*
    };
}

impl_sequence_value!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
