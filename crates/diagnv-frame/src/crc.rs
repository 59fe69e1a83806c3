//! CRC-16/X-25: reflected polynomial 0x8408, init 0xFFFF, final complement.

const POLY: u16 = 0x8408;
const INIT: u16 = 0xFFFF;

/// Incremental CRC-16 over scattered byte regions.
#[derive(Debug, Clone, Copy)]
pub struct Crc16 {
    acc: u16,
}

impl Crc16 {
    pub const fn new() -> Self {
        Self { acc: INIT }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.acc ^= u16::from(byte);
            for _ in 0..8 {
                if self.acc & 1 != 0 {
                    self.acc = (self.acc >> 1) ^ POLY;
                } else {
                    self.acc >>= 1;
                }
            }
        }
    }

    pub fn finish(self) -> u16 {
        !self.acc
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// Checksum of a single contiguous buffer.
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(bytes);
    crc.finish()
}
