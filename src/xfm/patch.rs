use std::fmt;
use log::debug;

use crate::{
    ParseError,
    Ranged,
};

use crate::xfm::{
    OPERATOR_COUNT,
    Level,
    MixerLevel,
    PitchLevel,
};

use crate::xfm::envelope::{PitchEnvelope, Stage};
use crate::xfm::operator::{Operator, OperatorParameter};
use crate::xfm::payload::{self, PAYLOAD_SIZE};
use crate::xfm::sysex::{SystemExclusiveData, FMTC, FMNM, TPDT};

/// Size of a record with a four-character name.
pub const SHORT_RECORD_SIZE: usize = 0xbc;

/// Size of a record with any other name, padded to eight bytes.
pub const LONG_RECORD_SIZE: usize = 0xc0;

const CHUNK_HEADER_SIZE: usize = 16;
const SHORT_NAME_SIZE: usize = 4;
const LONG_NAME_SIZE: usize = 8;
const NAME_PADDING: u8 = 0xff;

// Offsets in the 8-bit record
const NAME_CHUNK_SIZE_OFFSET: usize = 0x14;
const NAME_LENGTH_OFFSET: usize = 0x1c;
const NAME_OFFSET: usize = 0x20;
const SHORT_PAYLOAD_OFFSET: usize = 0x34;
const LONG_PAYLOAD_OFFSET: usize = 0x38;

/// Mixer settings.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Mixer {
    pub level: MixerLevel,
}

/// One parameter of a patch.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Parameter {
    Operator(usize, OperatorParameter),  // operator index 0...3
    PitchTime(Stage),
    PitchLevel(Stage),
    MixerLevel,
}

/// An XFM patch.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Patch {
    pub name: String,
    pub mixer: Mixer,
    pub pitch: PitchEnvelope,
    pub operators: [Operator; OPERATOR_COUNT],
}

impl Patch {
    /// Creates a new patch with the init settings:
    /// operator 1 sounds at full output, the others are silent.
    pub fn new() -> Self {
        Self {
            name: "INIT".to_string(),
            mixer: Mixer::default(),
            pitch: PitchEnvelope::new(),
            operators: [
                Operator { output: Level::new(127), ..Operator::new() },
                Operator::new(),
                Operator::new(),
                Operator::new(),
            ],
        }
    }

    /// Gets the raw value of a parameter.
    pub fn get(&self, parameter: Parameter) -> i32 {
        match parameter {
            Parameter::Operator(index, p) => self.operators[index].get(p),
            Parameter::PitchTime(stage) => self.pitch.time(stage).value(),
            Parameter::PitchLevel(stage) => self.pitch.level(stage).value(),
            Parameter::MixerLevel => self.mixer.level.value(),
        }
    }

    /// Sets a parameter from a raw value, clamping it to the range of the parameter.
    pub fn set(&mut self, parameter: Parameter, value: i32) {
        match parameter {
            Parameter::Operator(index, p) => self.operators[index].set(p, value),
            Parameter::PitchTime(stage) => self.pitch.times[stage.index()] = Level::clamped(value),
            Parameter::PitchLevel(stage) => self.pitch.levels[stage.index()] = PitchLevel::clamped(value),
            Parameter::MixerLevel => self.mixer.level = MixerLevel::clamped(value),
        }
    }

    /// Returns true if the name fits in the short record.
    pub fn has_short_name(&self) -> bool {
        self.name.chars().count() == SHORT_NAME_SIZE
    }

    /// Name bytes as stored in the record, one byte per character:
    /// four bytes as is, anything else cut or padded to eight bytes.
    /// Characters past U+00FF are stored as '?'.
    fn name_field(&self) -> (usize, Vec<u8>) {
        let bytes: Vec<u8> = self.name
            .chars()
            .map(|c| u8::try_from(c).unwrap_or(b'?'))
            .collect();
        if self.has_short_name() {
            return (bytes.len(), bytes);
        }

        let count = bytes.len().min(LONG_NAME_SIZE);
        let mut field = bytes[..count].to_vec();
        field.resize(LONG_NAME_SIZE, NAME_PADDING);
        (count, field)
    }
}

impl Default for Patch {
    fn default() -> Self {
        Patch::new()
    }
}

/// Checks a patch name against the rules of the device: one to four
/// characters (A...Z, 0...9 or space), optionally separated by single dots.
/// The name can't start with a dot, and it can only end with one
/// if there are at most three characters in front of it.
pub fn is_valid_name(name: &str) -> bool {
    let mut char_count = 0;
    let mut previous_dot = true;  // no dot at the start
    for c in name.chars() {
        if c == '.' {
            if previous_dot {
                return false;
            }
            previous_dot = true;
        }
        else if c.is_ascii_uppercase() || c.is_ascii_digit() || c == ' ' {
            char_count += 1;
            previous_dot = false;
        }
        else {
            return false;
        }
    }

    let ends_with_dot = name.ends_with('.');
    (1..=SHORT_NAME_SIZE).contains(&char_count)
        && !(ends_with_dot && char_count == SHORT_NAME_SIZE)
}

fn push_u32(data: &mut Vec<u8>, value: u32) {
    data.extend_from_slice(&value.to_le_bytes());
}

fn push_chunk_header(data: &mut Vec<u8>, tag: &[u8; 4], size: usize, count: u32) {
    data.extend_from_slice(tag);
    push_u32(data, size as u32);
    push_u32(data, 0);
    push_u32(data, count);
}

impl SystemExclusiveData for Patch {
    /// Makes a patch from an 8-bit FMTC record, as received from the device
    /// (after 7-to-8 bit conversion) or found in a bank.
    fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < NAME_OFFSET {
            return Err(ParseError::InvalidLength(data.len() as u32, SHORT_RECORD_SIZE as u32));
        }

        // The name chunk is 0x14 bytes for a four-character name
        let payload_offset = if data[NAME_CHUNK_SIZE_OFFSET] == 0x14 {
            SHORT_PAYLOAD_OFFSET
        }
        else {
            LONG_PAYLOAD_OFFSET
        };

        let name_length = data[NAME_LENGTH_OFFSET] as usize;
        let expected = (payload_offset + PAYLOAD_SIZE).max(NAME_OFFSET + name_length);
        if data.len() < expected {
            return Err(ParseError::InvalidLength(data.len() as u32, expected as u32));
        }

        let name: String = data[NAME_OFFSET..NAME_OFFSET + name_length]
            .iter()
            .map(|&b| b as char)
            .collect();
        debug!("Patch '{}', payload at {:#04x}", name, payload_offset);

        let patch = payload::decode_payload(&data[payload_offset..payload_offset + PAYLOAD_SIZE])?;
        Ok(Patch { name, ..patch })
    }

    /// Gets the FMTC record of this patch: the FMTC header,
    /// the FMNM name chunk and the TPDT tone data chunk.
    fn to_bytes(&self) -> Vec<u8> {
        let size = self.data_size();
        let (name_length, name_field) = self.name_field();

        let mut data: Vec<u8> = Vec::with_capacity(size);
        push_chunk_header(&mut data, &FMTC, size, 2);
        push_chunk_header(&mut data, &FMNM, CHUNK_HEADER_SIZE + name_field.len(), name_length as u32);
        data.extend(name_field);
        push_chunk_header(&mut data, &TPDT, CHUNK_HEADER_SIZE + PAYLOAD_SIZE, 1);
        data.extend(payload::encode_payload(self));

        assert_eq!(data.len(), size);

        data
    }

    fn data_size(&self) -> usize {
        if self.has_short_name() { SHORT_RECORD_SIZE } else { LONG_RECORD_SIZE }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "==========
{}
==========
OP1: {}
OP2: {}
OP3: {}
OP4: {}
Pitch: {}
Mixer level: {}
",
            self.name,
            self.operators[0],
            self.operators[1],
            self.operators[2],
            self.operators[3],
            self.pitch,
            self.mixer.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xfm::{Feedback, Ratio, first_different_offset};

    fn make_test_patch(name: &str) -> Patch {
        let mut patch = Patch::new();
        patch.name = name.to_string();
        patch.operators[1] = Operator {
            feedback: Feedback::new(125),
            ratio: Ratio::new(200),
            output: Level::new(64),
            ..Operator::new()
        };
        patch.operators[0].inputs[1] = Level::new(100);
        patch
    }

    #[test]
    fn test_init_patch() {
        let patch = Patch::new();
        assert_eq!(patch.name, "INIT");
        assert_eq!(patch.operators[0].output.value(), 127);
        assert!(patch.operators[1..].iter().all(|op| op.output.value() == 0));
    }

    #[test]
    fn test_short_record_layout() {
        let data = make_test_patch("BASS").to_bytes();
        assert_eq!(data.len(), SHORT_RECORD_SIZE);

        let expected_header = vec![
            0x46u8, 0x4d, 0x54, 0x43, 0xbc, 0x00, 0x00, 0x00,  // FMTC, size
            0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00,
            0x46, 0x4d, 0x4e, 0x4d, 0x14, 0x00, 0x00, 0x00,  // FMNM, size
            0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
            0x42, 0x41, 0x53, 0x53,  // BASS
            0x54, 0x50, 0x44, 0x54, 0x98, 0x00, 0x00, 0x00,  // TPDT, size
            0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
        ];

        let diff_offset = first_different_offset(&data[..SHORT_PAYLOAD_OFFSET], &expected_header);
        match diff_offset {
            Some(offset) => {
                println!("Vectors differ at offset {:?}", offset);
                println!("Expected = {}, actual = {}", expected_header[offset], data[offset]);
            },
            None => println!("Vectors are the same")
        }

        assert_eq!(&data[..SHORT_PAYLOAD_OFFSET], &expected_header[..]);
    }

    #[test]
    fn test_long_record_layout() {
        let data = make_test_patch("A.B.C.D").to_bytes();
        assert_eq!(data.len(), LONG_RECORD_SIZE);
        assert_eq!(data[4], 0xc0);
        assert_eq!(data[NAME_CHUNK_SIZE_OFFSET], 0x18);
        assert_eq!(data[NAME_LENGTH_OFFSET], 7);
        assert_eq!(&data[NAME_OFFSET..NAME_OFFSET + 8], b"A.B.C.D\xff");
        assert_eq!(&data[0x28..0x2c], b"TPDT");
        assert_eq!(&data[data.len() - 3..], &[0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_short_name_padding() {
        let data = make_test_patch("AB").to_bytes();
        assert_eq!(data.len(), LONG_RECORD_SIZE);
        assert_eq!(data[NAME_LENGTH_OFFSET], 2);
        assert_eq!(&data[NAME_OFFSET..NAME_OFFSET + 8], &[0x41, 0x42, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_record_round_trip() {
        for name in ["BASS", "A.B.C.D", "AB.", "X"] {
            let patch = make_test_patch(name);
            let decoded = Patch::from_bytes(&patch.to_bytes()).unwrap();
            assert_eq!(decoded, payload::transmitted(&patch));
        }
    }

    #[test]
    fn test_name_is_one_byte_per_char() {
        let patch = make_test_patch("ÄB.C");
        assert!(patch.has_short_name());
        let data = patch.to_bytes();
        assert_eq!(data.len(), SHORT_RECORD_SIZE);
        assert_eq!(&data[NAME_OFFSET..NAME_OFFSET + 4], &[0xc4, 0x42, 0x2e, 0x43]);
        assert_eq!(Patch::from_bytes(&data).unwrap().name, "ÄB.C");

        let data = make_test_patch("A€").to_bytes();
        assert_eq!(data[NAME_LENGTH_OFFSET], 2);
        assert_eq!(Patch::from_bytes(&data).unwrap().name, "A?");
    }

    #[test]
    fn test_from_bytes_too_short() {
        let data = Patch::new().to_bytes();
        assert_eq!(
            Patch::from_bytes(&data[..0x40]),
            Err(ParseError::InvalidLength(0x40, SHORT_RECORD_SIZE as u32)));
        assert_eq!(
            Patch::from_bytes(&data[..0x10]),
            Err(ParseError::InvalidLength(0x10, SHORT_RECORD_SIZE as u32)));
    }

    #[test]
    fn test_from_bytes_ignores_trailing_data() {
        let mut data = Patch::new().to_bytes();
        data.extend_from_slice(&[0x12, 0x34, 0x56]);
        assert_eq!(Patch::from_bytes(&data).unwrap(), payload::transmitted(&Patch::new()));
    }

    #[test]
    fn test_valid_names() {
        for name in ["INIT", "A", "A B", "1.2.3.4", "AB.", "ABC.", "A.BCD", "A.B.C.D"] {
            assert!(is_valid_name(name), "{}", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", ".A", "A..B", "ABCDE", "ABCD.", "abcd", "A-B", "...."] {
            assert!(!is_valid_name(name), "{}", name);
        }
    }

    #[test]
    fn test_parameter_access() {
        let mut patch = Patch::new();
        patch.set(Parameter::PitchLevel(Stage::Decay), -200);
        patch.set(Parameter::PitchTime(Stage::Decay), 10);
        patch.set(Parameter::Operator(3, OperatorParameter::Level), 5);
        assert_eq!(patch.get(Parameter::PitchLevel(Stage::Decay)), -128);
        assert_eq!(patch.get(Parameter::PitchTime(Stage::Decay)), 10);
        assert_eq!(patch.operators[3].level.value(), 5);
    }

    #[test]
    fn test_display_has_name() {
        let text = format!("{}", Patch::new());
        assert!(text.contains("INIT"));
        assert!(text.contains("OP4:"));
    }
}
