use std::fmt;
use std::convert::From;

use crate::Ranged;

pub mod seven_bit;
pub mod crc;
pub mod envelope;
pub mod operator;
pub mod payload;
pub mod patch;
pub mod sysex;
pub mod transmit;
pub mod bank;
pub mod document;

/// Number of FM operators in a patch.
pub const OPERATOR_COUNT: usize = 4;

// The device works with the ranges given in the comments, but the
// types accept anything their bytes can hold, so that data read from
// the device or a file is written back unchanged.

/// Level, time or amount (0...127). Used for operator output,
/// level, velocity sensitivity, modulation inputs and envelope stages.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Level(i32);

crate::ranged_impl!(Level, 0, 255, 0);

/// Operator feedback in tenths (-63.0...+64.0, stored as -630...640).
/// Sending adds or subtracts 0.1, so the range is one step wider.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Feedback(i32);

crate::ranged_impl!(Feedback, -631, 641, 0);

impl Feedback {
    /// Gets the feedback amount as a decimal number.
    pub fn as_f32(&self) -> f32 {
        self.0 as f32 / 10.0
    }
}

/// Frequency ratio in hundredths (0.50...32.00, stored as 50...3200).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Ratio(i32);

crate::ranged_impl!(Ratio, 0, 0xffff, 100);

impl Ratio {
    pub fn as_f32(&self) -> f32 {
        self.0 as f32 / 100.0
    }
}

/// Fixed operator frequency (0...97550). Only used when the operator is fixed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Frequency(i32);

crate::ranged_impl!(Frequency, 0, 0xffffff, 0);

/// Detune (-63...+63).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Detune(i32);

crate::ranged_impl!(Detune, -128, 127, 0);

/// Keyboard scaling gain (-63...+63), on either side of the break point.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Gain(i32);

crate::ranged_impl!(Gain, -128, 127, 0);

/// Envelope up or down curve amount (-18...+18).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Curvature(i32);

crate::ranged_impl!(Curvature, -128, 127, 0);

/// Pitch envelope level (-48...+48).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PitchLevel(i32);

crate::ranged_impl!(PitchLevel, -128, 127, 0);

/// Mixer level, stored in the patch as a signed byte.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MixerLevel(i32);

crate::ranged_impl!(MixerLevel, -128, 127, 0);

/// Keyboard scaling break point (0...6 = C1...C7).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Breakpoint(i32);

crate::ranged_impl!(Breakpoint, 0, 255, 0);

impl Breakpoint {
    pub fn name(&self) -> String {
        format!("C{}", self.0 + 1)
    }
}

/// On/off setting (0 or 1).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Switch(i32);

crate::ranged_impl!(Switch, 0, 255, 0);

impl Switch {
    pub fn is_on(&self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Switch {
    fn from(on: bool) -> Self {
        Switch(on as i32)
    }
}

/// Keyboard scaling curve style.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum CurveStyle {
    #[default]
    Linear,
    Exponential,
}

impl fmt::Display for CurveStyle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CurveStyle::Linear => write!(f, "LIN"),
            CurveStyle::Exponential => write!(f, "EXP"),
        }
    }
}

impl From<bool> for CurveStyle {
    fn from(bit: bool) -> Self {
        if bit { CurveStyle::Exponential } else { CurveStyle::Linear }
    }
}

impl From<CurveStyle> for bool {
    fn from(style: CurveStyle) -> bool {
        style == CurveStyle::Exponential
    }
}

/// Reinterprets a byte as a signed value: 0...127 stay as they are,
/// 128...255 become -128...-1.
pub fn to_signed(byte: u8) -> i32 {
    if byte > 127 {
        byte as i32 - 256
    }
    else {
        byte as i32
    }
}

/// Truncates a signed value to its two's complement byte.
pub fn to_unsigned_byte(value: i32) -> u8 {
    (value & 0xff) as u8
}

// Finds the first offset where the two slices differ.
// Returns None if no differences are found, or if the slices
// are different lengths, Some<usize> with the offset otherwise.
pub fn first_different_offset(v1: &[u8], v2: &[u8]) -> Option<usize> {
    if v1.len() != v2.len() {
        return None;
    }

    v1.iter().zip(v2.iter()).position(|(a, b)| a != b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_signed() {
        assert_eq!(to_signed(0), 0);
        assert_eq!(to_signed(127), 127);
        assert_eq!(to_signed(128), -128);
        assert_eq!(to_signed(255), -1);
    }

    #[test]
    fn test_to_unsigned_byte() {
        assert_eq!(to_unsigned_byte(-1), 0xff);
        assert_eq!(to_unsigned_byte(-63), 0xc1);
        assert_eq!(to_unsigned_byte(64), 0x40);
        assert_eq!(to_unsigned_byte(-128), 0x80);
    }

    #[test]
    fn test_signed_conversion_is_inverse() {
        for value in -128..=127 {
            assert_eq!(to_signed(to_unsigned_byte(value)), value);
        }
    }

    #[test]
    #[should_panic(expected = "expected value in range")]
    fn test_invalid_new_panics() {
        let ratio = Ratio::new(-1);
        assert_eq!(ratio.value(), -1);
    }

    #[test]
    fn test_valid_new_succeeds() {
        let feedback = Feedback::new(-630);
        assert_eq!(feedback.value(), -630);
        assert_eq!(feedback.as_f32(), -63.0);
        assert_eq!(Feedback::new(641).as_f32(), 64.1);
    }

    #[test]
    fn test_clamped() {
        assert_eq!(Level::clamped(300).value(), 255);
        assert_eq!(Detune::clamped(-200).value(), -128);
        assert_eq!(Curvature::clamped(5).value(), 5);
        assert_eq!(Feedback::clamped(1271).value(), 641);
    }

    #[test]
    fn test_random_is_in_range() {
        for _ in 0..100 {
            assert!(Breakpoint::contains(Breakpoint::random().value()));
        }
    }

    #[test]
    fn test_breakpoint_name() {
        assert_eq!(Breakpoint::new(0).name(), "C1");
        assert_eq!(Breakpoint::new(6).name(), "C7");
    }

    #[test]
    fn test_switch() {
        assert!(!Switch::default().is_on());
        assert!(Switch::from(true).is_on());
        assert!(Switch::new(2).is_on());
        assert_eq!(Switch::from(true).value(), 1);
    }

    #[test]
    fn test_ratio_default() {
        assert_eq!(Ratio::default().as_f32(), 1.0);
    }

    #[test]
    fn test_first_different_offset() {
        assert_eq!(first_different_offset(&[1, 2, 3], &[1, 2, 3]), None);
        assert_eq!(first_different_offset(&[1, 2, 3], &[1, 5, 3]), Some(1));
        assert_eq!(first_different_offset(&[1, 2], &[1, 2, 3]), None);
    }
}
