//! Per-PID section reassembly state machine.
//!
//! Consumes packet payloads one at a time and emits complete, CRC-valid
//! sections. Duplicates are dropped silently, discontinuities abandon the
//! partial section and resynchronize on the next unit-start marker,
//! scrambled payloads are skipped without touching state.

use bytes::BytesMut;

use crate::constants::*;
use crate::packet::TsPacket;
use crate::section::Section;
use crate::types::{DemuxEvent, ValidationFailure};

pub struct SectionReassembler {
    pid: u16,
    last_cc: Option<u8>,
    /// Byte accumulator for the in-progress section.
    buffer: BytesMut,
    /// Total image size, known once three header bytes have accumulated.
    expected_len: Option<usize>,
    /// False until a unit-start marker gives us a trustworthy byte to
    /// start from, and again after any discontinuity.
    collecting: bool,
}

impl SectionReassembler {
    pub fn new(pid: u16) -> Self {
        Self {
            pid,
            last_cc: None,
            buffer: BytesMut::with_capacity(SECTION_SIZE_MAX),
            expected_len: None,
            collecting: false,
        }
    }

    /// Feeds one packet; completed valid sections are returned, everything
    /// observable but non-fatal goes into `events`.
    pub fn feed(&mut self, pkt: &TsPacket, events: &mut Vec<DemuxEvent>) -> Vec<Section> {
        let mut out = Vec::new();

        if pkt.scrambled {
            // cannot recover section bytes; partial state stays untouched
            events.push(DemuxEvent::ScrambledPayload { pid: self.pid });
            return out;
        }
        if !pkt.has_payload() {
            // continuity counter is not meaningful without payload
            return out;
        }

        if let Some(prev) = self.last_cc {
            let expected = (prev + 1) % CC_MODULUS;
            if pkt.continuity_counter == prev {
                // duplicate retransmission, payload already processed
                return out;
            }
            if pkt.continuity_counter != expected {
                events.push(DemuxEvent::Discontinuity {
                    pid: self.pid,
                    expected,
                    actual: pkt.continuity_counter,
                });
                self.abandon();
            }
        }
        self.last_cc = Some(pkt.continuity_counter);

        let data = &pkt.payload[..];
        if pkt.payload_unit_start {
            let pointer = data[0] as usize;
            if 1 + pointer > data.len() {
                events.push(DemuxEvent::ValidationFailure {
                    pid: self.pid,
                    reason: ValidationFailure::BadPointer,
                });
                self.abandon();
                return out;
            }

            // bytes before the pointer target belong to the in-progress
            // section; anything left unclosed after them is lost
            if self.collecting {
                self.accumulate(&data[1..1 + pointer], events, &mut out);
                if self.collecting {
                    self.abandon();
                }
            }

            // scan decides whether a section actually starts here; the
            // region may be nothing but stuffing
            self.scan(&data[1 + pointer..], events, &mut out);
        } else if self.collecting {
            // pure continuation: a new section cannot start here, so any
            // remainder after a close is stuffing
            self.accumulate(data, events, &mut out);
        }

        out
    }

    /// Explicitly drops all per-PID state.
    pub fn reset(&mut self) {
        self.abandon();
        self.last_cc = None;
    }

    fn abandon(&mut self) {
        self.buffer.clear();
        self.expected_len = None;
        self.collecting = false;
    }

    /// Walks a unit-start payload region, closing back-to-back sections
    /// until the bytes run out or a stuffing byte ends the packet.
    fn scan(&mut self, mut data: &[u8], events: &mut Vec<DemuxEvent>, out: &mut Vec<Section>) {
        loop {
            if !self.collecting {
                if data.is_empty() || data[0] == STUFFING_BYTE {
                    return;
                }
                self.collecting = true;
            }
            data = self.accumulate(data, events, out);
            if self.collecting {
                // section spans into the next packet
                return;
            }
        }
    }

    /// Appends bytes to the current section, closing it once the declared
    /// length is satisfied. Returns the unconsumed remainder.
    fn accumulate<'a>(
        &mut self,
        mut data: &'a [u8],
        events: &mut Vec<DemuxEvent>,
        out: &mut Vec<Section>,
    ) -> &'a [u8] {
        if self.expected_len.is_none() {
            // the length field is readable only once three header bytes
            // have accumulated
            let need = SECTION_PREFIX_SIZE.saturating_sub(self.buffer.len());
            let take = need.min(data.len());
            self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.buffer.len() < SECTION_PREFIX_SIZE {
                return data;
            }

            let sec_len = (((self.buffer[1] & 0x0F) as usize) << 8) | self.buffer[2] as usize;
            if sec_len > SECTION_LENGTH_MAX {
                events.push(DemuxEvent::ValidationFailure {
                    pid: self.pid,
                    reason: ValidationFailure::SectionTooLong,
                });
                self.abandon();
                return &[];
            }
            if sec_len < SECTION_LENGTH_MIN {
                events.push(DemuxEvent::ValidationFailure {
                    pid: self.pid,
                    reason: ValidationFailure::SectionTooShort,
                });
                self.abandon();
                return &[];
            }
            self.expected_len = Some(SECTION_PREFIX_SIZE + sec_len);
        }

        let expected = match self.expected_len {
            Some(n) => n,
            None => return data,
        };
        let take = (expected - self.buffer.len()).min(data.len());
        self.buffer.extend_from_slice(&data[..take]);
        let rest = &data[take..];

        if self.buffer.len() == expected {
            let raw = self.buffer.split().freeze();
            self.expected_len = None;
            self.collecting = false;
            match Section::parse(&raw) {
                Ok(section) => out.push(section),
                Err(_) => events.push(DemuxEvent::ValidationFailure {
                    pid: self.pid,
                    reason: ValidationFailure::CrcMismatch,
                }),
            }
        }
        rest
    }
}
