//! Fixed 188-byte transport packet: parsing and serialization.
//!
//! Only the fields the section layer needs are surfaced: PID, continuity
//! counter, payload-unit-start, scrambling state and the payload bytes
//! left after the adaptation field. A wrong-size or out-of-sync buffer is
//! a contract violation at the boundary, reported as a hard error.

use bitstream_io::{BigEndian, BitRead, BitReader};

use crate::constants::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsPacket {
    pub pid: u16,
    /// 4-bit counter, meaningful only when the packet carries payload.
    pub continuity_counter: u8,
    /// The payload begins with a pointer byte to a new section start.
    pub payload_unit_start: bool,
    /// Non-zero transport_scrambling_control; payload is undecodable.
    pub scrambled: bool,
    /// Bytes after the header/adaptation field, at most 184.
    pub payload: Vec<u8>,
}

impl TsPacket {
    /// Parses one on-wire packet. Exactly 188 bytes and a leading sync
    /// byte are required; anything else is a caller bug, not stream noise.
    pub fn parse(chunk: &[u8]) -> anyhow::Result<Self> {
        if chunk.len() != TS_PACKET_SIZE {
            anyhow::bail!("packet must be {TS_PACKET_SIZE} bytes, got {}", chunk.len());
        }

        let mut rdr = BitReader::endian(chunk, BigEndian);
        let sync: u8 = rdr.read::<8, u8>()?;
        if sync != TS_SYNC_BYTE {
            anyhow::bail!("bad sync byte 0x{sync:02X}");
        }
        let _transport_error: bool = rdr.read_bit()?;
        let payload_unit_start = rdr.read_bit()?;
        let _priority: bool = rdr.read_bit()?;
        let pid: u16 = rdr.read::<13, u16>()?;
        let scrambling: u8 = rdr.read::<2, u8>()?;
        let adaptation_field_ctrl: u8 = rdr.read::<2, u8>()?;
        let continuity_counter: u8 = rdr.read::<4, u8>()?;

        let mut payload_offset = 4usize;
        if adaptation_field_ctrl & 0x01 == 0 {
            // adaptation-only or reserved: no payload bytes
            return Ok(Self {
                pid,
                continuity_counter,
                payload_unit_start,
                scrambled: scrambling != 0,
                payload: Vec::new(),
            });
        }
        if adaptation_field_ctrl == 3 {
            let adap_len = chunk[4] as usize;
            payload_offset += 1 + adap_len;
            if payload_offset > TS_PACKET_SIZE {
                anyhow::bail!("adaptation field length {adap_len} overruns packet");
            }
        }

        Ok(Self {
            pid,
            continuity_counter,
            payload_unit_start,
            scrambled: scrambling != 0,
            payload: chunk[payload_offset..].to_vec(),
        })
    }

    /// Serializes back to the fixed on-wire form. Payloads shorter than
    /// 184 bytes are completed with an adaptation field of stuffing.
    pub fn to_bytes(&self) -> anyhow::Result<[u8; TS_PACKET_SIZE]> {
        if self.payload.len() > TS_PAYLOAD_MAX {
            anyhow::bail!("payload of {} bytes exceeds {TS_PAYLOAD_MAX}", self.payload.len());
        }
        if self.pid > PID_MAX {
            anyhow::bail!("PID 0x{:X} out of 13-bit range", self.pid);
        }

        let mut out = [STUFFING_BYTE; TS_PACKET_SIZE];
        out[0] = TS_SYNC_BYTE;
        out[1] = (if self.payload_unit_start { 0x40 } else { 0x00 }) | ((self.pid >> 8) as u8 & 0x1F);
        out[2] = (self.pid & 0xFF) as u8;

        let pad = TS_PAYLOAD_MAX - self.payload.len();
        let adaptation_field_ctrl: u8 = if pad == 0 { 0b01 } else { 0b11 };
        out[3] = (if self.scrambled { 0x80 } else { 0x00 })
            | (adaptation_field_ctrl << 4)
            | (self.continuity_counter & 0x0F);

        let mut idx = 4;
        if pad > 0 {
            // adaptation field eats the slack: length byte, then flags if
            // there is room, then stuffing
            out[4] = (pad - 1) as u8;
            if pad >= 2 {
                out[5] = 0x00;
            }
            idx = 4 + pad;
        }
        out[idx..].copy_from_slice(&self.payload);
        Ok(out)
    }

    /// Null packet on the reserved stuffing PID.
    pub fn null() -> Self {
        Self {
            pid: PID_NULL,
            continuity_counter: 0,
            payload_unit_start: false,
            scrambled: false,
            payload: vec![STUFFING_BYTE; TS_PAYLOAD_MAX],
        }
    }

    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_wrong_size() {
        assert!(TsPacket::parse(&[0x47; 100]).is_err());
        assert!(TsPacket::parse(&[0x47; 189]).is_err());
    }

    #[test]
    fn parse_rejects_bad_sync() {
        let mut chunk = [0u8; TS_PACKET_SIZE];
        chunk[0] = 0x48;
        assert!(TsPacket::parse(&chunk).is_err());
    }

    #[test]
    fn round_trip_full_payload() {
        let pkt = TsPacket {
            pid: 0x1234 & PID_MAX,
            continuity_counter: 7,
            payload_unit_start: true,
            scrambled: false,
            payload: (0..TS_PAYLOAD_MAX as u8).map(|i| i.wrapping_mul(3)).collect(),
        };
        let wire = pkt.to_bytes().unwrap();
        let back = TsPacket::parse(&wire).unwrap();
        assert_eq!(back, pkt);
    }

    #[test]
    fn round_trip_short_payload_uses_adaptation_stuffing() {
        let pkt = TsPacket {
            pid: 0x0042,
            continuity_counter: 0,
            payload_unit_start: false,
            scrambled: false,
            payload: vec![1, 2, 3, 4, 5],
        };
        let wire = pkt.to_bytes().unwrap();
        assert_eq!((wire[3] & 0x30) >> 4, 0b11);
        let back = TsPacket::parse(&wire).unwrap();
        assert_eq!(back.payload, pkt.payload);
        assert_eq!(back.pid, pkt.pid);
    }

    #[test]
    fn scrambling_bits_are_reported() {
        let pkt = TsPacket {
            pid: 0x0100,
            continuity_counter: 1,
            payload_unit_start: false,
            scrambled: true,
            payload: vec![0xAA; TS_PAYLOAD_MAX],
        };
        let back = TsPacket::parse(&pkt.to_bytes().unwrap()).unwrap();
        assert!(back.scrambled);
    }

    #[test]
    fn null_packet_round_trips() {
        let wire = TsPacket::null().to_bytes().unwrap();
        let back = TsPacket::parse(&wire).unwrap();
        assert_eq!(back.pid, PID_NULL);
        assert_eq!(back.payload.len(), TS_PAYLOAD_MAX);
    }
}
