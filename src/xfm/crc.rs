// CRC-32 as used by the XFM to check patch data.
//
// This is the widely used reversed polynomial 0xEDB88320 (zlib, PNG, PKZip)
// with a zero seed, so the result matches `zlib.crc32(data)`.

const POLYNOMIAL: u32 = 0xedb88320;

const fn make_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut j = 0;
        while j < 8 {
            c = if c & 1 != 0 { POLYNOMIAL ^ (c >> 1) } else { c >> 1 };
            j += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

/// Lookup table, computed at compile time.
static TABLE: [u32; 256] = make_table();

/// Computes the CRC-32 of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    let crc = data.iter().fold(0xffffffffu32, |crc, &b| {
        (crc >> 8) ^ TABLE[((crc ^ b as u32) & 0xff) as usize]
    });
    crc ^ 0xffffffff
}
