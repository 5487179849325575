//! CRC-32 (MPEG-2 variant) over section bytes.
//!
//! Non-reflected, seed all-ones, no final XOR. The demux uses it to
//! accept/reject reassembled sections, the packetizer to stamp outgoing
//! ones.

use crc::{CRC_32_MPEG_2, Crc};

use crate::constants::SECTION_CRC_SIZE;

const CRC_MPEG: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// CRC-32/MPEG-2 over `bytes`.
pub fn compute(bytes: &[u8]) -> u32 {
    CRC_MPEG.checksum(bytes)
}

/// Checks the trailing big-endian CRC of a complete section image.
pub fn verify(bytes_with_trailing_code: &[u8]) -> bool {
    let len = bytes_with_trailing_code.len();
    if len < SECTION_CRC_SIZE {
        return false;
    }
    let body = &bytes_with_trailing_code[..len - SECTION_CRC_SIZE];
    let tail: [u8; 4] = match bytes_with_trailing_code[len - SECTION_CRC_SIZE..].try_into() {
        Ok(t) => t,
        Err(_) => return false,
    };
    compute(body) == u32::from_be_bytes(tail)
}

/// Overwrites the last four bytes with the CRC of everything before them.
pub fn stamp(bytes: &mut [u8]) {
    let len = bytes.len();
    if len < SECTION_CRC_SIZE {
        return;
    }
    let code = compute(&bytes[..len - SECTION_CRC_SIZE]);
    bytes[len - SECTION_CRC_SIZE..].copy_from_slice(&code.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_is_deterministic() {
        let data = [0x42, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0x00, 0x00];
        assert_eq!(compute(&data), compute(&data));
    }

    #[test]
    fn stamp_then_verify() {
        let mut data = vec![0x42, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0, 0, 0, 0];
        stamp(&mut data);
        assert!(verify(&data));
    }

    #[test]
    fn verify_rejects_flipped_bit() {
        let mut data = vec![0x42, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0, 0, 0, 0];
        stamp(&mut data);
        data[3] ^= 0x01;
        assert!(!verify(&data));
    }

    #[test]
    fn verify_rejects_short_input() {
        assert!(!verify(&[0x00, 0x01]));
    }
}
