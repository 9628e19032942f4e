use std::collections::BTreeMap;
use std::fmt;
use log::{debug, warn};

use crate::ParseError;
use crate::xfm::patch::Patch;
use crate::xfm::seven_bit::unpack78;
use crate::xfm::sysex::{SystemExclusiveData, FMTC, FMBC, BKDT};

/// Patches by bank name. Files with a single bank use `DEFAULT_BANK`.
pub type Banks = BTreeMap<String, Vec<Patch>>;

pub const DEFAULT_BANK: &str = "default";

// A .syx file from the device starts with a 20-byte declare message
// and ends with a 15-byte checksum message.
const FIRST_BLOCK_SIZE: usize = 20;
const LAST_BLOCK_SIZE: usize = 15;
const IDENTIFIER_OFFSET: usize = 10;
const IDENTIFIER_SIZE: usize = 4;

// Banks and dumps are sent as a series of messages of this size
const BLOCK_SIZE: usize = 250;

const BANK_HEADER_SIZE: usize = 52;
const DUMP_HEADER_SIZE: usize = 4096;
const DUMP_PREFIX_SIZE: usize = 20;
const DUMP_MAGIC: &str = "PREF$";
const BANK_NAME_OFFSET: usize = 32;
const BANK_NAME_SIZE: usize = 20;

/// Finds the start offsets of `marker` in `data`, left to right.
/// Matches don't overlap.
pub fn find_sequence_indexes(data: &[u8], marker: &[u8; 4]) -> Vec<usize> {
    let mut indexes = Vec::new();
    let mut i = 0;
    while i + marker.len() <= data.len() {
        if &data[i..i + marker.len()] == marker {
            indexes.push(i);
            i += marker.len();
        }
        else {
            i += 1;
        }
    }
    indexes
}

/// Splits `data` at FMTC markers and decodes each record.
/// Records that can't be decoded are skipped.
pub fn bank_patches(data: &[u8]) -> Vec<Patch> {
    let indexes = find_sequence_indexes(data, &FMTC);

    let mut patches = Vec::new();
    for (i, &start) in indexes.iter().enumerate() {
        let end = indexes.get(i + 1).copied().unwrap_or(data.len());
        match Patch::from_bytes(&data[start..end]) {
            Ok(patch) => patches.push(patch),
            Err(e) => warn!("Skipping patch #{} at offset {}: {}", i + 1, start, e),
        }
    }

    debug!("Found {} patches in {} records", patches.len(), indexes.len());
    patches
}

fn bank_name(bank: &[u8]) -> String {
    let end = (BANK_NAME_OFFSET + BANK_NAME_SIZE).min(bank.len());
    let field = bank.get(BANK_NAME_OFFSET..end).unwrap_or(&[]);
    let field = match find_sequence_indexes(field, &BKDT).first() {
        Some(&index) => &field[..index],
        None => field,
    };

    field.iter()
        .map(|&b| b as char)
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '.')
        .collect()
}

fn is_dump(data: &[u8]) -> bool {
    let prefix: String = data.iter()
        .take(DUMP_PREFIX_SIZE)
        .map(|&b| b as char)
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '$')
        .collect();
    prefix.starts_with(DUMP_MAGIC)
}

/// The contents of a .syx file, identified from its data.
/// Each kind carries the file data converted to 8-bit.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SyxFile {
    SinglePatch(Vec<u8>),
    Bank(Vec<u8>),
    FullDump(Vec<u8>),
    Unidentified(Vec<u8>),
}

impl SyxFile {
    /// Identifies the kind of a .syx file and converts its data to 8-bit.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let minimum = FIRST_BLOCK_SIZE + IDENTIFIER_OFFSET + IDENTIFIER_SIZE + LAST_BLOCK_SIZE;
        if data.len() < minimum {
            return Err(ParseError::InvalidLength(data.len() as u32, minimum as u32));
        }

        let stripped = &data[FIRST_BLOCK_SIZE..data.len() - LAST_BLOCK_SIZE];
        let identifier = &stripped[IDENTIFIER_OFFSET..IDENTIFIER_OFFSET + IDENTIFIER_SIZE];

        if identifier == FMTC {
            return Ok(SyxFile::SinglePatch(unpack78(stripped)?));
        }

        let mut unpacked = Vec::new();
        for block in stripped.chunks(BLOCK_SIZE) {
            unpacked.extend(unpack78(block)?);
        }
        debug!("Unpacked {} blocks into {} bytes", stripped.len().div_ceil(BLOCK_SIZE), unpacked.len());

        if identifier == FMBC {
            Ok(SyxFile::Bank(unpacked))
        }
        else if is_dump(&unpacked) {
            Ok(SyxFile::FullDump(unpacked))
        }
        else {
            warn!("Unidentified file (identifier {:02X?}), reading it as a bank", identifier);
            Ok(SyxFile::Unidentified(unpacked))
        }
    }

    /// Gets the 8-bit data.
    pub fn data(&self) -> &[u8] {
        match self {
            SyxFile::SinglePatch(data)
            | SyxFile::Bank(data)
            | SyxFile::FullDump(data)
            | SyxFile::Unidentified(data) => data,
        }
    }

    /// Rejects files that could not be identified,
    /// for callers who don't want them read as a bank.
    pub fn identified(self) -> Result<Self, ParseError> {
        match self {
            SyxFile::Unidentified(_) => Err(ParseError::Unidentified),
            file => Ok(file),
        }
    }

    /// Decodes the patches in the file. A full dump gives one entry
    /// for each bank, everything else gives a single default bank.
    pub fn into_banks(self) -> Result<Banks, ParseError> {
        let mut banks = Banks::new();
        match self {
            SyxFile::SinglePatch(data) => {
                banks.insert(DEFAULT_BANK.to_string(), vec![Patch::from_bytes(&data)?]);
            },
            SyxFile::Bank(data) | SyxFile::Unidentified(data) => {
                let patches_data = data.get(BANK_HEADER_SIZE..)
                    .ok_or(ParseError::InvalidLength(data.len() as u32, BANK_HEADER_SIZE as u32))?;
                banks.insert(DEFAULT_BANK.to_string(), bank_patches(patches_data));
            },
            SyxFile::FullDump(data) => {
                let banks_data = data.get(DUMP_HEADER_SIZE..)
                    .ok_or(ParseError::InvalidLength(data.len() as u32, DUMP_HEADER_SIZE as u32))?;
                let indexes = find_sequence_indexes(banks_data, &FMBC);
                for (i, &start) in indexes.iter().enumerate() {
                    let end = indexes.get(i + 1).copied().unwrap_or(banks_data.len());
                    let bank = &banks_data[start..end];
                    let name = bank_name(bank);
                    debug!("Bank '{}' at offset {}", name, DUMP_HEADER_SIZE + start);
                    banks.insert(name, bank_patches(bank));
                }
            },
        }
        Ok(banks)
    }
}

impl fmt::Display for SyxFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f, "{}",
            match self {
                SyxFile::SinglePatch(_) => "single patch",
                SyxFile::Bank(_) => "bank",
                SyxFile::FullDump(_) => "full dump",
                SyxFile::Unidentified(_) => "unidentified",
            })
    }
}

/// Gets the patches from the contents of a .syx file.
pub fn extract_patches_from_syx_bank(data: &[u8]) -> Result<Banks, ParseError> {
    let file = SyxFile::parse(data)?;
    debug!("File is a {} with {} bytes of data", file, file.data().len());
    file.into_banks()
}
