//! Packetizer: serializes complete sections into a transport packet
//! stream for one PID.
//!
//! Section bytes are packed contiguously across packet boundaries; the
//! unit-start flag and pointer byte are set exactly on the packet where a
//! new section begins, and the final packet of a batch is completed with
//! stuffing bytes. The continuity counter advances only on packets that
//! carry real payload.

pub mod carousel;

pub use carousel::{CycleInterval, CyclingPacketizer, EntryId};

use std::collections::VecDeque;

use crate::constants::*;
use crate::crc32;
use crate::demux::Table;
use crate::packet::TsPacket;
use crate::section::Section;

pub struct Packetizer {
    pid: u16,
    continuity_counter: u8,
    /// Serialized section images waiting to be packed.
    queue: VecDeque<Vec<u8>>,
    /// In-flight image and how far into it we are.
    current: Option<(Vec<u8>, usize)>,
}

impl Packetizer {
    pub fn new(pid: u16) -> Self {
        Self {
            pid,
            continuity_counter: 0,
            queue: VecDeque::new(),
            current: None,
        }
    }

    pub fn pid(&self) -> u16 {
        self.pid
    }

    /// Queues one section for transmission. The CRC is re-stamped so
    /// callers never need a pre-computed code.
    pub fn push_section(&mut self, section: &Section) {
        let mut raw = section.as_bytes().to_vec();
        crc32::stamp(&mut raw);
        self.queue.push_back(raw);
    }

    /// Queues every section of a table, in order.
    pub fn push_table(&mut self, table: &Table) {
        for section in table.sections() {
            self.push_section(section);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.current.is_some() || !self.queue.is_empty()
    }

    /// Emits the next packet of the batch, or `None` once every queued
    /// section has been sent. Callers that must keep a constant packet
    /// rate send [`TsPacket::null`] in the gaps.
    pub fn next_packet(&mut self) -> Option<TsPacket> {
        if self.current.is_none() {
            self.current = Some((self.queue.pop_front()?, 0));
        }

        let mut payload: Vec<u8> = Vec::with_capacity(TS_PAYLOAD_MAX);
        let mut unit_start = false;

        if let Some((bytes, offset)) = self.current.take() {
            if offset == 0 {
                // a section begins at the top of this packet
                unit_start = true;
                payload.push(0);
                self.current = Some((bytes, 0));
            } else {
                let remaining = bytes.len() - offset;
                if remaining < TS_PAYLOAD_MAX - 1 && !self.queue.is_empty() {
                    // finish the section, then start the next one behind a
                    // pointer byte; pointer plus tail must leave room for at
                    // least one byte of the next section
                    unit_start = true;
                    payload.push(remaining as u8);
                    payload.extend_from_slice(&bytes[offset..]);
                } else {
                    let take = remaining.min(TS_PAYLOAD_MAX);
                    payload.extend_from_slice(&bytes[offset..offset + take]);
                    if take < remaining {
                        self.current = Some((bytes, offset + take));
                    }
                }
            }
        }

        if unit_start {
            // pack whole or partial sections back-to-back while room lasts
            while payload.len() < TS_PAYLOAD_MAX {
                let (bytes, offset) = match self.current.take() {
                    Some(c) => c,
                    None => match self.queue.pop_front() {
                        Some(b) => (b, 0),
                        None => break,
                    },
                };
                let room = TS_PAYLOAD_MAX - payload.len();
                let remaining = bytes.len() - offset;
                let take = remaining.min(room);
                payload.extend_from_slice(&bytes[offset..offset + take]);
                if take < remaining {
                    self.current = Some((bytes, offset + take));
                    break;
                }
            }
        }

        payload.resize(TS_PAYLOAD_MAX, STUFFING_BYTE);
        let pkt = TsPacket {
            pid: self.pid,
            continuity_counter: self.continuity_counter,
            payload_unit_start: unit_start,
            scrambled: false,
            payload,
        };
        self.continuity_counter = (self.continuity_counter + 1) % CC_MODULUS;
        Some(pkt)
    }
}
