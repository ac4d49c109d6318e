//! CRC-32 accumulator for FCode blocks
//!
//! Bit-compatible with zlib's `crc32()`: reflected polynomial `0xEDB88320`,
//! initial value and final XOR of `0xFFFFFFFF`, chained through the running
//! value so a block may be fed in any number of pieces.

const POLYNOMIAL: u32 = 0xEDB8_8320;

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Continue a checksum over `bytes`, starting from `running` (0 for a new block)
pub fn update(running: u32, bytes: &[u8]) -> u32 {
    let mut crc = !running;
    for &byte in bytes {
        crc = TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    !crc
}

/// Checksum of a complete block
pub fn checksum(bytes: &[u8]) -> u32 {
    update(0, bytes)
}

/// Running checksum scoped to one logical block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crc32 {
    value: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.value = update(self.value, bytes);
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    /// Start a new block scope
    pub fn reset(&mut self) {
        self.value = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
        assert_eq!(checksum(b""), 0);
    }

    #[test]
    fn test_chained_updates_match_single_pass() {
        let data = b"FCx0001\n\x80\x00\x00\x20\x41";
        let chained = update(update(0, &data[..5]), &data[5..]);
        assert_eq!(chained, checksum(data));
    }

    #[test]
    fn test_accumulator_reset() {
        let mut crc = Crc32::new();
        crc.update(b"1234");
        crc.update(b"56789");
        assert_eq!(crc.value(), 0xCBF4_3926);
        crc.reset();
        assert_eq!(crc.value(), 0);
    }
}
