// The 0x88-byte tone data payload.
//
// Every parameter of a patch lives at a fixed offset in the payload.
// The layout is described once, as a table of fields, and walked by
// a single encoder and a single decoder.
//
// | Offset      | Contents                                          |
// |-------------|---------------------------------------------------|
// | 0x00...0x03 | feedback low byte, OP1...OP4                      |
// | 0x04...0x13 | fixed flag + frequency (LE 24), OP1...OP4         |
// | 0x14...0x23 | ratio (LE 16), level, detune, OP1...OP4           |
// | 0x24...0x43 | envelope times A/D/S/R, levels A/D/S/R, OP1...OP4 |
// | 0x44...0x4B | pitch envelope times, levels                      |
// | 0x4C...0x5B | L gain, R gain, curves, scale, OP1...OP4          |
// | 0x5C...0x6B | 4x4 modulation matrix, feedback on the diagonal   |
// | 0x6C...0x83 | output, vel sens, time, pitch env, up/down curve  |
// | 0x84        | mixer level                                       |
// | 0x85...0x87 | 0xFF padding                                      |

use bit::BitIndex;
use log::warn;
use num::Integer;

use crate::ParseError;
use crate::Ranged;
use crate::xfm::{
    OPERATOR_COUNT,
    Feedback,
    to_signed,
    to_unsigned_byte,
};
use crate::xfm::envelope::Stage;
use crate::xfm::operator::OperatorParameter;
use crate::xfm::patch::{Parameter, Patch};

/// Size of the tone data payload in bytes.
pub const PAYLOAD_SIZE: usize = 0x88;

/// Number of 0xFF bytes that end the payload.
pub const PADDING_SIZE: usize = 3;

const OPERATOR_FIELD_COUNT: usize = 28;
const PITCH_FIELD_COUNT: usize = 8;

/// Number of fields in the payload layout.
pub const FIELD_COUNT: usize = OPERATOR_COUNT * OPERATOR_FIELD_COUNT + PITCH_FIELD_COUNT + 1;

/// How a value is stored at its offset.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Encoding {
    Byte,
    SignedByte,
    Word,  // 16-bit little-endian
    TriByte,  // 24-bit little-endian
    Flag { bit: usize },  // one bit, other bits of the byte belong to other fields
    // Feedback: floor(value / 10) as a signed byte at the field offset,
    // the sign of the fraction (+1 or -1) at `fraction_offset`.
    SplitFeedback { fraction_offset: usize },
}

/// Where and how one parameter is stored in the payload.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FieldLayout {
    pub parameter: Parameter,
    pub offset: usize,
    pub encoding: Encoding,
}

impl FieldLayout {
    /// Reads the raw value of the field from the payload.
    pub fn read(&self, data: &[u8]) -> i32 {
        let o = self.offset;
        match self.encoding {
            Encoding::Byte => data[o] as i32,
            Encoding::SignedByte => to_signed(data[o]),
            Encoding::Word => u16::from_le_bytes([data[o], data[o + 1]]) as i32,
            Encoding::TriByte => u32::from_le_bytes([data[o], data[o + 1], data[o + 2], 0]) as i32,
            Encoding::Flag { bit } => data[o].bit(bit) as i32,
            Encoding::SplitFeedback { fraction_offset } =>
                to_signed(data[o]) * 10 + to_signed(data[fraction_offset]),
        }
    }

    /// Writes the raw value of the field into the payload.
    pub fn write(&self, value: i32, data: &mut [u8]) {
        let o = self.offset;
        match self.encoding {
            Encoding::Byte | Encoding::SignedByte => data[o] = to_unsigned_byte(value),
            Encoding::Word => data[o..o + 2].copy_from_slice(&(value as u16).to_le_bytes()),
            Encoding::TriByte => data[o..o + 3].copy_from_slice(&(value as u32).to_le_bytes()[..3]),
            Encoding::Flag { bit } => { data[o].set_bit(bit, value != 0); },
            Encoding::SplitFeedback { fraction_offset } => {
                let (whole, sign) = split_feedback(value);
                data[o] = to_unsigned_byte(whole);
                data[fraction_offset] = to_unsigned_byte(sign);
            },
        }
    }

    /// Number of bytes the field occupies at its offset.
    pub fn width(&self) -> usize {
        match self.encoding {
            Encoding::Word => 2,
            Encoding::TriByte => 3,
            _ => 1,
        }
    }
}

/// Splits a feedback amount (in tenths) into the two values the device gets:
/// the whole part rounded down, and -1 for a negative amount with a fraction,
/// +1 otherwise. The fraction digit itself is not sent.
pub fn split_feedback(value: i32) -> (i32, i32) {
    let whole = Integer::div_floor(&value, &10);
    let sign = if value < 0 && value.abs() % 10 != 0 { -1 } else { 1 };
    (whole, sign)
}

/// Gets the feedback amount that comes back after sending `value`.
/// For example 12.5 becomes 12.1, -12.5 becomes -13.1 and 0 becomes 0.1.
pub fn sent_feedback(value: i32) -> i32 {
    let (whole, sign) = split_feedback(value);
    whole * 10 + sign
}

/// Gets the patch as it reads back after encoding.
/// Only the feedback amounts change.
pub fn transmitted(patch: &Patch) -> Patch {
    let mut result = patch.clone();
    for op in result.operators.iter_mut() {
        op.feedback = Feedback::clamped(sent_feedback(op.feedback.value()));
    }
    result
}

const fn field(parameter: Parameter, offset: usize, encoding: Encoding) -> FieldLayout {
    FieldLayout { parameter, offset, encoding }
}

const fn op_field(op: usize, parameter: OperatorParameter, offset: usize, encoding: Encoding) -> FieldLayout {
    field(Parameter::Operator(op, parameter), offset, encoding)
}

// The operators that can modulate `op`.
const fn sources(op: usize) -> [usize; 3] {
    match op {
        0 => [1, 2, 3],
        1 => [0, 2, 3],
        2 => [0, 1, 3],
        _ => [0, 1, 2],
    }
}

const fn operator_fields(op: usize) -> [FieldLayout; OPERATOR_FIELD_COUNT] {
    use OperatorParameter as P;
    use Encoding::*;

    let matrix = 0x5c + 4 * op;  // one row per operator, column = source
    let tuning = 0x04 + 4 * op;
    let pitch = 0x14 + 4 * op;
    let eg = 0x24 + 8 * op;
    let scaling = 0x4c + 4 * op;
    let inputs = sources(op);

    [
        op_field(op, P::Feedback, matrix + op, SplitFeedback { fraction_offset: op }),
        op_field(op, P::Input(inputs[0]), matrix + inputs[0], Byte),
        op_field(op, P::Input(inputs[1]), matrix + inputs[1], Byte),
        op_field(op, P::Input(inputs[2]), matrix + inputs[2], Byte),
        op_field(op, P::Fixed, tuning, Byte),
        op_field(op, P::Freq, tuning + 1, TriByte),
        op_field(op, P::Ratio, pitch, Word),
        op_field(op, P::Level, pitch + 2, Byte),
        op_field(op, P::Detune, pitch + 3, SignedByte),
        op_field(op, P::EnvTime(Stage::Attack), eg, Byte),
        op_field(op, P::EnvTime(Stage::Decay), eg + 1, Byte),
        op_field(op, P::EnvTime(Stage::Sustain), eg + 2, Byte),
        op_field(op, P::EnvTime(Stage::Release), eg + 3, Byte),
        op_field(op, P::EnvLevel(Stage::Attack), eg + 4, Byte),
        op_field(op, P::EnvLevel(Stage::Decay), eg + 5, Byte),
        op_field(op, P::EnvLevel(Stage::Sustain), eg + 6, Byte),
        op_field(op, P::EnvLevel(Stage::Release), eg + 7, Byte),
        op_field(op, P::LeftGain, scaling, SignedByte),
        op_field(op, P::RightGain, scaling + 1, SignedByte),
        op_field(op, P::LeftCurve, scaling + 2, Flag { bit: 0 }),
        op_field(op, P::RightCurve, scaling + 2, Flag { bit: 4 }),
        op_field(op, P::Scale, scaling + 3, Byte),
        op_field(op, P::Output, 0x6c + op, Byte),
        op_field(op, P::VelSens, 0x70 + op, Byte),
        op_field(op, P::Time, 0x74 + op, Byte),
        op_field(op, P::PitchEnv, 0x78 + op, Byte),
        op_field(op, P::UpCurve, 0x7c + 2 * op, SignedByte),
        op_field(op, P::DownCurve, 0x7d + 2 * op, SignedByte),
    ]
}

const fn build_layout() -> [FieldLayout; FIELD_COUNT] {
    let mut layout = [field(Parameter::MixerLevel, 0x84, Encoding::SignedByte); FIELD_COUNT];
    let mut index = 0;

    let mut op = 0;
    while op < OPERATOR_COUNT {
        let fields = operator_fields(op);
        let mut i = 0;
        while i < OPERATOR_FIELD_COUNT {
            layout[index] = fields[i];
            index += 1;
            i += 1;
        }
        op += 1;
    }

    let mut s = 0;
    while s < Stage::ALL.len() {
        layout[index] = field(Parameter::PitchTime(Stage::ALL[s]), 0x44 + s, Encoding::Byte);
        layout[index + 1] = field(Parameter::PitchLevel(Stage::ALL[s]), 0x48 + s, Encoding::SignedByte);
        index += 2;
        s += 1;
    }

    // The last entry is the mixer level it was initialized with.
    layout
}

/// Layout of every parameter in the payload.
pub static PAYLOAD_LAYOUT: [FieldLayout; FIELD_COUNT] = build_layout();

/// Encodes the parameters of a patch into the tone data payload.
/// The name is not part of the payload.
pub fn encode_payload(patch: &Patch) -> [u8; PAYLOAD_SIZE] {
    let mut data = [0u8; PAYLOAD_SIZE];
    for field in PAYLOAD_LAYOUT.iter() {
        field.write(patch.get(field.parameter), &mut data);
    }
    data[PAYLOAD_SIZE - PADDING_SIZE..].fill(0xff);
    data
}

/// Decodes the tone data payload. The name of the returned patch is empty.
/// Every byte is kept as it is, except feedback amounts that don't fit,
/// which are clamped.
pub fn decode_payload(data: &[u8]) -> Result<Patch, ParseError> {
    if data.len() < PAYLOAD_SIZE {
        return Err(ParseError::InvalidLength(data.len() as u32, PAYLOAD_SIZE as u32));
    }

    let mut patch = Patch { name: String::new(), ..Patch::new() };
    for field in PAYLOAD_LAYOUT.iter() {
        let value = field.read(data);
        patch.set(field.parameter, value);
        if patch.get(field.parameter) != value {
            warn!("Value {} of {:?} at offset {:#04x} is out of range, using {}",
                value, field.parameter, field.offset, patch.get(field.parameter));
        }
    }

    Ok(patch)
}
