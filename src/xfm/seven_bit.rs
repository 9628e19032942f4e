// 7-bit MIDI-safe encoding of 8-bit data.
//
// SysEx data bytes can only carry 7 bits, so the message body after the
// 9-byte header is sent in groups of up to 7 bytes. Each group is preceded
// by a mask byte saying which of the following bytes had bit 7 set:
// bit 6 of the mask belongs to the first byte, bit 0 to the seventh.

use bit::BitIndex;
use log::debug;

use crate::ParseError;

/// Length of the device header plus the sequence byte.
pub const PREFIX_SIZE: usize = 9;

/// End of System Exclusive.
pub const END_OF_EXCLUSIVE: u8 = 0xf7;

const GROUP_SIZE: usize = 7;

/// Converts one mask byte and its (up to 7) data bytes back to 8-bit data.
fn unpack_group(mask: u8, data: &[u8]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(n, &b)| {
            if (mask << (n + 1)) & 0x80 != 0 { b | 0x80 } else { b }
        })
        .collect()
}

/// Unpacks a complete SysEx message (header, sequence byte, packed body and
/// optional 0xF7) into the 8-bit body. The header and sequence byte are
/// discarded, and so are the mask bytes.
pub fn unpack78(data: &[u8]) -> Result<Vec<u8>, ParseError> {
    if data.len() < PREFIX_SIZE {
        return Err(ParseError::InvalidLength(data.len() as u32, PREFIX_SIZE as u32));
    }

    let mut body = &data[PREFIX_SIZE..];
    if let Some((&last, rest)) = body.split_last() {
        if last == END_OF_EXCLUSIVE {
            body = rest;
        }
    }

    let mut result = Vec::with_capacity(body.len() * GROUP_SIZE / (GROUP_SIZE + 1) + 1);
    for (index, group) in body.chunks(GROUP_SIZE + 1).enumerate() {
        if group.len() < 2 {
            // A mask byte with nothing left to apply it to
            let offset = PREFIX_SIZE + index * (GROUP_SIZE + 1);
            return Err(ParseError::MalformedBuffer(offset as u32));
        }
        result.extend(unpack_group(group[0], &group[1..]));
    }

    debug!("Unpacked {} bytes of SysEx into {} bytes", data.len(), result.len());

    Ok(result)
}

/// Packs a complete message (header and sequence byte followed by 8-bit
/// body) into its 7-bit form. The first 9 bytes are copied as is.
/// The terminating 0xF7 is not added.
pub fn pack87(data: &[u8]) -> Vec<u8> {
    let split = data.len().min(PREFIX_SIZE);
    let (header, body) = data.split_at(split);

    let mut result = Vec::with_capacity(header.len() + body.len() + body.len() / GROUP_SIZE + 1);
    result.extend_from_slice(header);

    for chunk in body.chunks(GROUP_SIZE) {
        let mut mask = 0u8;
        let mut packed = [0u8; GROUP_SIZE];
        for (j, &b) in chunk.iter().enumerate() {
            mask |= (b & 0x80) >> (j + 1);
            let mut low = b;
            low.set_bit(7, false);
            packed[j] = low;
        }
        result.push(mask);
        result.extend_from_slice(&packed[..chunk.len()]);
    }

    result
}
