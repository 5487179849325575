//! Cycling packetizer: continuous repeated transmission of a set of
//! tables ("carousel").
//!
//! Each cycle entry pairs a table with a repetition interval and a PID.
//! The schedule is a min-heap keyed by (due tick, entry id), so
//! simultaneously-due entries always fire in registration order. The
//! clock is the count of packets this carousel has emitted; `tick()`
//! produces exactly one packet, falling back to null packets when nothing
//! is due.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::constants::TS_PACKET_SIZE;
use crate::demux::Table;
use crate::mux::Packetizer;
use crate::packet::TsPacket;

pub type EntryId = u32;

/// Spacing between two transmissions of one entry's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleInterval {
    /// Fixed spacing in emitted-packet units.
    Packets(u64),
    /// Wall-clock spacing at a given mux bitrate, converted to packets.
    Timed { millis: u64, bits_per_second: u64 },
}

impl CycleInterval {
    /// Interval in emitted-packet units; never zero.
    pub fn as_packets(&self) -> u64 {
        match *self {
            CycleInterval::Packets(n) => n.max(1),
            CycleInterval::Timed { millis, bits_per_second } => {
                let packet_bits = (TS_PACKET_SIZE * 8) as u64;
                (bits_per_second * millis / (1000 * packet_bits)).max(1)
            }
        }
    }
}

struct CycleEntry {
    pid: u16,
    table: Table,
    interval: u64,
    due: u64,
    /// Applied at the next scheduling boundary so an in-flight cycle is
    /// never disturbed.
    replacement: Option<Table>,
}

#[derive(Default)]
pub struct CyclingPacketizer {
    entries: HashMap<EntryId, CycleEntry>,
    /// Min-heap of (due, id); stale nodes are skipped on pop.
    schedule: BinaryHeap<Reverse<(u64, EntryId)>>,
    packetizers: HashMap<u16, Packetizer>,
    /// PID whose current batch still has packets to emit.
    draining: Option<u16>,
    ticks: u64,
    next_id: EntryId,
}

impl CyclingPacketizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table for repeated transmission; it becomes due
    /// immediately. Returns the id used by `replace`/`remove`.
    pub fn add(&mut self, pid: u16, table: Table, interval: CycleInterval) -> EntryId {
        let id = self.next_id;
        self.next_id += 1;
        let due = self.ticks;
        self.entries.insert(
            id,
            CycleEntry {
                pid,
                table,
                interval: interval.as_packets(),
                due,
                replacement: None,
            },
        );
        self.schedule.push(Reverse((due, id)));
        id
    }

    /// Stops cycling an entry. Unknown ids are a caller bug.
    pub fn remove(&mut self, id: EntryId) -> anyhow::Result<()> {
        if self.entries.remove(&id).is_none() {
            anyhow::bail!("no cycle entry with id {id}");
        }
        Ok(())
    }

    /// Swaps an entry's content without losing its slot in the cycle; the
    /// new table is first transmitted when the entry next comes due.
    pub fn replace(&mut self, id: EntryId, table: Table) -> anyhow::Result<()> {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.replacement = Some(table);
                Ok(())
            }
            None => anyhow::bail!("no cycle entry with id {id}"),
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Emits exactly one packet: the in-flight batch first, otherwise the
    /// earliest due entry's table, otherwise a null packet.
    pub fn tick(&mut self) -> TsPacket {
        let pkt = self.next_payload_packet().unwrap_or_else(TsPacket::null);
        self.ticks += 1;
        pkt
    }

    fn next_payload_packet(&mut self) -> Option<TsPacket> {
        if let Some(pid) = self.draining {
            if let Some(pz) = self.packetizers.get_mut(&pid) {
                if let Some(pkt) = pz.next_packet() {
                    if !pz.has_pending() {
                        self.draining = None;
                    }
                    return Some(pkt);
                }
            }
            self.draining = None;
        }

        while let Some(&Reverse((due, id))) = self.schedule.peek() {
            if due > self.ticks {
                return None;
            }
            self.schedule.pop();
            let Some(entry) = self.entries.get_mut(&id) else {
                continue; // removed entry, stale heap node
            };
            if entry.due != due {
                continue; // rescheduled since this node was pushed
            }

            if let Some(table) = entry.replacement.take() {
                entry.table = table;
            }
            let pid = entry.pid;
            let pz = self
                .packetizers
                .entry(pid)
                .or_insert_with(|| Packetizer::new(pid));
            pz.push_table(&entry.table);

            // re-arm on the scheduled grid, clamped so a long batch never
            // leaves the entry permanently overdue
            entry.due = (entry.due + entry.interval).max(self.ticks);
            self.schedule.push(Reverse((entry.due, id)));

            let pkt = pz.next_packet()?;
            if pz.has_pending() {
                self.draining = Some(pid);
            }
            return Some(pkt);
        }
        None
    }
}
