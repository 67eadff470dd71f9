use crate::CHECKSUM_SEED;

/// Running XOR checksum sent as the final byte of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksum(u8);

impl Checksum {
    pub fn new() -> Self {
        Self(CHECKSUM_SEED)
    }

    pub fn update(&mut self, byte: u8) {
        self.0 ^= byte;
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn of(data: &[u8]) -> Self {
        let mut checksum = Self::new();
        for &byte in data {
            checksum.update(byte);
        }
        checksum
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}
