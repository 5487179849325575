//! Variable-length, CRC-protected section: the unit of metadata transport.
//!
//! A `Section` owns its complete on-wire image (8-byte header, opaque
//! payload, trailing CRC-32) and exposes the identity fields the table
//! layer keys on. Payload semantics are out of scope here.

use bytes::Bytes;

use crate::constants::*;
use crate::crc32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    raw: Bytes,
}

impl Section {
    /// Validates framing and CRC of a complete section image.
    ///
    /// An image whose length disagrees with its section_length field, or
    /// whose length field is out of bounds, is rejected; so is a CRC
    /// mismatch.
    pub fn parse(raw: &[u8]) -> anyhow::Result<Self> {
        if raw.len() < SECTION_HEADER_SIZE + SECTION_CRC_SIZE {
            anyhow::bail!("section image of {} bytes is too short", raw.len());
        }
        let sec_len = (((raw[1] & 0x0F) as usize) << 8) | raw[2] as usize;
        if sec_len < SECTION_LENGTH_MIN {
            anyhow::bail!("section_length {sec_len} below minimum {SECTION_LENGTH_MIN}");
        }
        if sec_len > SECTION_LENGTH_MAX {
            anyhow::bail!("section_length {sec_len} exceeds maximum {SECTION_LENGTH_MAX}");
        }
        if raw.len() != SECTION_PREFIX_SIZE + sec_len {
            anyhow::bail!(
                "section_length {sec_len} disagrees with image of {} bytes",
                raw.len()
            );
        }
        if !crc32::verify(raw) {
            anyhow::bail!("CRC-32 mismatch");
        }
        Ok(Self { raw: Bytes::copy_from_slice(raw) })
    }

    /// Builds a section from identity fields and an opaque payload,
    /// stamping the CRC. Oversized payloads are a hard error.
    pub fn build(
        table_id: u8,
        table_id_extension: u16,
        version: u8,
        section_number: u8,
        last_section_number: u8,
        payload: &[u8],
    ) -> anyhow::Result<Self> {
        let sec_len = SECTION_LENGTH_MIN + payload.len();
        if sec_len > SECTION_LENGTH_MAX {
            anyhow::bail!(
                "payload of {} bytes exceeds section capacity of {} ",
                payload.len(),
                SECTION_LENGTH_MAX - SECTION_LENGTH_MIN
            );
        }
        if section_number > last_section_number {
            anyhow::bail!("section_number {section_number} beyond last {last_section_number}");
        }

        let mut raw = Vec::with_capacity(SECTION_PREFIX_SIZE + sec_len);
        raw.push(table_id);
        // section_syntax_indicator set, reserved bits per ISO 13818-1
        raw.push(0xB0 | ((sec_len >> 8) as u8 & 0x0F));
        raw.push((sec_len & 0xFF) as u8);
        raw.extend_from_slice(&table_id_extension.to_be_bytes());
        raw.push(0xC1 | ((version & 0x1F) << 1));
        raw.push(section_number);
        raw.push(last_section_number);
        raw.extend_from_slice(payload);
        raw.extend_from_slice(&[0u8; SECTION_CRC_SIZE]);
        crc32::stamp(&mut raw);

        Ok(Self { raw: Bytes::from(raw) })
    }

    pub fn table_id(&self) -> u8 {
        self.raw[0]
    }

    pub fn table_id_extension(&self) -> u16 {
        u16::from_be_bytes([self.raw[3], self.raw[4]])
    }

    /// 5-bit version number.
    pub fn version(&self) -> u8 {
        (self.raw[5] & 0x3E) >> 1
    }

    pub fn section_number(&self) -> u8 {
        self.raw[6]
    }

    pub fn last_section_number(&self) -> u8 {
        self.raw[7]
    }

    /// Bytes between the header and the CRC, semantically opaque.
    pub fn payload(&self) -> &[u8] {
        &self.raw[SECTION_HEADER_SIZE..self.raw.len() - SECTION_CRC_SIZE]
    }

    pub fn crc(&self) -> u32 {
        let tail = &self.raw[self.raw.len() - SECTION_CRC_SIZE..];
        u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]])
    }

    /// Complete on-wire image including header and CRC.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn size(&self) -> usize {
        self.raw.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_parse_preserves_fields() {
        let sec = Section::build(0x42, 0x0001, 3, 1, 2, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        let back = Section::parse(sec.as_bytes()).unwrap();
        assert_eq!(back.table_id(), 0x42);
        assert_eq!(back.table_id_extension(), 0x0001);
        assert_eq!(back.version(), 3);
        assert_eq!(back.section_number(), 1);
        assert_eq!(back.last_section_number(), 2);
        assert_eq!(back.payload(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn parse_rejects_corrupted_payload() {
        let sec = Section::build(0x42, 0, 0, 0, 0, &[1, 2, 3]).unwrap();
        let mut raw = sec.as_bytes().to_vec();
        raw[SECTION_HEADER_SIZE] ^= 0x01;
        assert!(Section::parse(&raw).is_err());
    }

    #[test]
    fn parse_rejects_length_mismatch() {
        let sec = Section::build(0x42, 0, 0, 0, 0, &[1, 2, 3]).unwrap();
        let mut raw = sec.as_bytes().to_vec();
        raw.push(0xFF);
        assert!(Section::parse(&raw).is_err());
    }

    #[test]
    fn build_rejects_oversized_payload() {
        let payload = vec![0u8; SECTION_LENGTH_MAX];
        assert!(Section::build(0x42, 0, 0, 0, 0, &payload).is_err());
    }

    #[test]
    fn build_rejects_section_number_past_last() {
        assert!(Section::build(0x42, 0, 0, 5, 2, &[]).is_err());
    }

    #[test]
    fn max_size_payload_is_accepted() {
        let payload = vec![0xAB; SECTION_LENGTH_MAX - SECTION_LENGTH_MIN];
        let sec = Section::build(0x42, 0, 0, 0, 0, &payload).unwrap();
        assert_eq!(sec.size(), SECTION_SIZE_MAX);
        assert!(Section::parse(sec.as_bytes()).is_ok());
    }

    #[test]
    fn version_wraps_at_five_bits() {
        let sec = Section::build(0x42, 0, 31, 0, 0, &[]).unwrap();
        assert_eq!(sec.version(), 31);
    }
}
