//! CRC-16/X-25 (also known as CRC-16-HDLC or CRC-16-IBM-SDLC).

/// Reflected form of the CCITT polynomial `0x1021`.
pub const POLY_REVERSED: u16 = 0x8408;

const INIT: u16 = 0xFFFF;
const XOR_OUT: u16 = 0xFFFF;

/// Compute the CRC-16/X-25 of `data`.
///
/// Bytes are processed LSB-first with the register seeded to `0xFFFF`; the
/// result is XORed with `0xFFFF`.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = INIT;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 0x0001 != 0 {
                (crc >> 1) ^ POLY_REVERSED
            } else {
                crc >> 1
            };
        }
    }
    crc ^ XOR_OUT
}

/// The CRC of `data` in wire order (little-endian).
pub fn crc16_bytes(data: &[u8]) -> [u8; 2] {
    crc16(data).to_le_bytes()
}
