//! FINGERPRINT attribute (spec.md §4.1): CRC32 of all preceding bytes,
//! XORed with `0x5354554E` ("STUN" in ASCII).

use crc::{Crc, CRC_32_ISO_HDLC};

const FINGERPRINT_XOR: u32 = 0x5354554e;

static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn compute(data: &[u8]) -> u32 {
    CRC32.checksum(data) ^ FINGERPRINT_XOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_flip_changes_fingerprint() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let original = compute(data);
        for bit in 0..data.len() * 8 {
            let mut flipped = data.to_vec();
            flipped[bit / 8] ^= 1 << (bit % 8);
            assert_ne!(compute(&flipped), original, "bit {bit} did not change fingerprint");
        }
    }
}
