//! Synch-safe integers as used by ID3v2 size fields
//!
//! A synch-safe integer stores 7 bits per byte with the high bit of every
//! byte cleared, so four bytes carry 28 bits of value.

/// Largest value a 4-byte synch-safe field can hold
pub const MAX: u32 = (1 << 28) - 1;

/// Unpack four 7-bit groups from a big-endian u32 (high bit of each byte ignored)
pub fn decode(raw: u32) -> u32 {
    let [a, b, c, d] = raw.to_be_bytes();
    ((a as u32 & 0x7F) << 21) | ((b as u32 & 0x7F) << 14) | ((c as u32 & 0x7F) << 7) | (d as u32 & 0x7F)
}

/// Spread the low 28 bits of `value` over four 7-bit groups
pub fn encode(value: u32) -> u32 {
    ((value & 0x0FE0_0000) << 3) | ((value & 0x001F_C000) << 2) | ((value & 0x0000_3F80) << 1) | (value & 0x7F)
}

/// Encode straight to the 4 bytes written in a header
pub fn to_bytes(value: u32) -> [u8; 4] {
    encode(value).to_be_bytes()
}

/// True if none of the four bytes has its high bit set
pub fn is_valid(raw: u32) -> bool {
    raw & 0x8080_8080 == 0
}
