pub mod xfm;

use std::fmt;

/// Error type for parsing data from MIDI System Exclusive bytes.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ParseError {
    InvalidLength(u32, u32),  // actual, expected
    MalformedBuffer(u32),  // offset in data
    Unidentified,  // can't identify this kind
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            ParseError::InvalidLength(actual, expected) => format!("Got {} bytes of data, expected {} bytes.", actual, expected),
            ParseError::MalformedBuffer(offset) => format!("Malformed data at offset {}.", offset),
            ParseError::Unidentified => String::from("Unable to identify this System Exclusive file."),
        })
    }
}

impl std::error::Error for ParseError {}

// Define associated consts in a trait, but don't give them a value.
// Let the implementor of the trait do that.
pub trait Ranged: Sized {
    const FIRST: i32;
    const LAST: i32;
    const DEFAULT: i32;

    fn new(value: i32) -> Self;
    fn value(&self) -> i32;
    fn contains(value: i32) -> bool;
    fn random() -> Self;

    /// Makes a value, pulling an out-of-range input to the nearest end of the range.
    fn clamped(value: i32) -> Self {
        Self::new(value.clamp(Self::FIRST, Self::LAST))
    }
}

// The `ranged_impl` macro generates an implementation of the `Ranged` trait,
// along with implementations of the `Default` and `Display` traits based on
// the values supplied as parameters (type name, first, last, default).
#[macro_export]
macro_rules! ranged_impl {
    ($typ:ty, $first:expr, $last:expr, $default:expr) => {
        impl $crate::Ranged for $typ {
            const FIRST: i32 = $first;
            const LAST: i32 = $last;
            const DEFAULT: i32 = $default;

            fn new(value: i32) -> Self {
                if <Self as $crate::Ranged>::contains(value) {
                    Self(value)
                }
                else {
                    panic!("expected value in range [{}...{}], got {}",
                        <Self as $crate::Ranged>::FIRST,
                        <Self as $crate::Ranged>::LAST,
                        value);
                }
            }

            fn value(&self) -> i32 { self.0 }

            fn contains(value: i32) -> bool {
                value >= <Self as $crate::Ranged>::FIRST && value <= <Self as $crate::Ranged>::LAST
            }

            fn random() -> Self {
                let mut rng = ::rand::rng();
                <Self as $crate::Ranged>::new(::rand::Rng::random_range(
                    &mut rng,
                    <Self as $crate::Ranged>::FIRST..=<Self as $crate::Ranged>::LAST))
            }
        }

        impl Default for $typ {
            fn default() -> Self {
                <Self as $crate::Ranged>::new(<Self as $crate::Ranged>::DEFAULT)
            }
        }

        impl std::fmt::Display for $typ {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    }
}
