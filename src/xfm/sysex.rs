use std::convert::{
    From,
    TryFrom
};

use std::fmt;
use log::debug;

use crate::ParseError;
use crate::xfm::crc::crc32;
use crate::xfm::patch::Patch;
use crate::xfm::seven_bit::{pack87, unpack78, PREFIX_SIZE, END_OF_EXCLUSIVE};

/// Parsing and generating MIDI System Exclusive data.
pub trait SystemExclusiveData: Sized {
    fn from_bytes(data: &[u8]) -> Result<Self, ParseError>;
    fn to_bytes(&self) -> Vec<u8>;
    fn data_size(&self) -> usize;
}

/// Device header that starts every message.
pub const HEADER: [u8; 8] = [0xf0, 0x00, 0x48, 0x04, 0x00, 0x00, 0x03, 0x60];

// Chunk tags
pub const FMTC: [u8; 4] = *b"FMTC";  // patch record
pub const FMNM: [u8; 4] = *b"FMNM";  // patch name
pub const TPDT: [u8; 4] = *b"TPDT";  // tone data
pub const FMBC: [u8; 4] = *b"FMBC";  // bank
pub const BKDT: [u8; 4] = *b"BKDT";  // bank data

/// Inbound messages this short can't hold a patch.
pub const MIN_INBOUND_SIZE: usize = 21;

/// Position of a message in the three-message burst.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum Sequence {
    Declare = 1,
    Data = 2,
    Checksum = 3,
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f, "{}",
            match *self {
                Sequence::Declare => "declare",
                Sequence::Data => "data",
                Sequence::Checksum => "checksum",
            })
    }
}

impl TryFrom<u8> for Sequence {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Sequence::Declare),
            2 => Ok(Sequence::Data),
            3 => Ok(Sequence::Checksum),
            _ => Err("Bad sequence value")
        }
    }
}

impl From<Sequence> for u8 {
    fn from(s: Sequence) -> u8 {
        s as u8
    }
}

/// Kind of data announced by the declare message.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum DataType {
    Bank = 1,
    Sound = 4,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f, "{}",
            match *self {
                DataType::Bank => "bank",
                DataType::Sound => "sound",
            })
    }
}

impl TryFrom<u8> for DataType {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DataType::Bank),
            4 => Ok(DataType::Sound),
            _ => Err("Bad data type value")
        }
    }
}

impl From<DataType> for u8 {
    fn from(t: DataType) -> u8 {
        t as u8
    }
}

fn message_start(sequence: Sequence) -> Vec<u8> {
    let mut result = HEADER.to_vec();
    result.push(sequence.into());
    result
}

fn finish(raw: &[u8]) -> Vec<u8> {
    let mut result = pack87(raw);
    result.push(END_OF_EXCLUSIVE);
    result
}

/// Message 1: announces a sound and the size of its record.
pub fn declare_message(patch: &Patch) -> Vec<u8> {
    let mut raw = message_start(Sequence::Declare);
    raw.extend_from_slice(&(u8::from(DataType::Sound) as u32).to_le_bytes());
    raw.extend_from_slice(&(patch.data_size() as u32).to_le_bytes());
    finish(&raw)
}

/// Message 2 in its raw 8-bit form: header, sequence byte and the patch record.
/// The checksum is computed over this form, so it is kept unpacked.
pub fn data_message(patch: &Patch) -> Vec<u8> {
    let mut raw = message_start(Sequence::Data);
    raw.extend(patch.to_bytes());
    raw
}

/// Message 3: the CRC-32 of the raw data message, without its header and sequence byte.
pub fn checksum_message(raw_data: &[u8]) -> Vec<u8> {
    let body = raw_data.get(PREFIX_SIZE..).unwrap_or(&[]);
    let mut raw = message_start(Sequence::Checksum);
    raw.extend_from_slice(&crc32(body).to_le_bytes());
    finish(&raw)
}

/// Makes the three messages that send a patch to the device.
/// They must be sent in this order.
pub fn encode_outbound_patch(patch: &Patch) -> [Vec<u8>; 3] {
    let raw_data = data_message(patch);
    debug!("Patch '{}': {} bytes of data, CRC {:08x}",
        patch.name, raw_data.len() - PREFIX_SIZE, crc32(&raw_data[PREFIX_SIZE..]));

    [
        declare_message(patch),
        finish(&raw_data),
        checksum_message(&raw_data),
    ]
}

/// Decodes a patch from a data message received from the device.
/// The checksum that follows it is not verified.
pub fn decode_inbound_message(data: &[u8]) -> Result<Patch, ParseError> {
    if data.len() < MIN_INBOUND_SIZE {
        return Err(ParseError::InvalidLength(data.len() as u32, MIN_INBOUND_SIZE as u32));
    }

    let record = unpack78(data)?;
    Patch::from_bytes(&record)
}
