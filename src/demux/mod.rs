//! Section demultiplexer: entry point of the decode direction.
//!
//! Owns one reassembler + aggregator pair per observed PID, created
//! lazily on the first packet for that PID. Purely structural: section
//! payload bytes are never interpreted here.

pub mod aggregate;
pub mod reassembly;

pub use aggregate::{Table, TableAggregator};
pub use reassembly::SectionReassembler;

use std::collections::HashMap;

use crate::constants::PID_NULL;
use crate::packet::TsPacket;
use crate::types::DemuxEvent;

struct PidState {
    reassembler: SectionReassembler,
    aggregator: TableAggregator,
}

impl PidState {
    fn new(pid: u16) -> Self {
        Self {
            reassembler: SectionReassembler::new(pid),
            aggregator: TableAggregator::new(),
        }
    }
}

#[derive(Default)]
pub struct SectionDemux {
    pids: HashMap<u16, PidState>,
}

impl SectionDemux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes one packet through its PID's reassembler and aggregator and
    /// returns everything observable that happened.
    pub fn process(&mut self, pkt: &TsPacket) -> Vec<DemuxEvent> {
        if pkt.pid == PID_NULL {
            return Vec::new();
        }
        let state = self
            .pids
            .entry(pkt.pid)
            .or_insert_with(|| PidState::new(pkt.pid));

        let mut events = Vec::new();
        for section in state.reassembler.feed(pkt, &mut events) {
            events.push(DemuxEvent::SectionCompleted {
                pid: pkt.pid,
                section: section.clone(),
            });
            if let Some(table) = state.aggregator.accept(section) {
                events.push(DemuxEvent::TableCompleted { pid: pkt.pid, table });
            }
        }
        events
    }

    /// Drops all state for one PID; used when a caller knows content has
    /// been intentionally superseded.
    pub fn reset(&mut self, pid: u16) {
        if let Some(state) = self.pids.get_mut(&pid) {
            state.reassembler.reset();
            state.aggregator.clear();
        }
    }

    /// Drops all per-PID state.
    pub fn reset_all(&mut self) {
        self.pids.clear();
    }

    /// PIDs with at least one packet seen (null PID excluded).
    pub fn observed_pids(&self) -> Vec<u16> {
        let mut pids: Vec<u16> = self.pids.keys().copied().collect();
        pids.sort_unstable();
        pids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mux::Packetizer;
    use crate::section::Section;

    fn packets_for(pid: u16, sections: &[Section]) -> Vec<TsPacket> {
        let mut pz = Packetizer::new(pid);
        for s in sections {
            pz.push_section(s);
        }
        let mut pkts = Vec::new();
        while let Some(p) = pz.next_packet() {
            pkts.push(p);
        }
        pkts
    }

    fn completed_tables(events: &[DemuxEvent]) -> Vec<&Table> {
        events
            .iter()
            .filter_map(|e| match e {
                DemuxEvent::TableCompleted { table, .. } => Some(table),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn round_trip_multi_section_table() {
        let payloads: Vec<Vec<u8>> = vec![vec![0x10; 300], vec![0x20; 950], vec![0x30; 4]];
        let sections: Vec<Section> = payloads
            .iter()
            .enumerate()
            .map(|(i, p)| Section::build(0x42, 0xBEEF, 5, i as u8, 2, p).unwrap())
            .collect();
        let table = Table::from_sections(sections.clone()).unwrap();

        let mut demux = SectionDemux::new();
        let mut events = Vec::new();
        for pkt in packets_for(0x123, &sections) {
            events.extend(demux.process(&pkt));
        }

        let tables = completed_tables(&events);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0], &table);
        assert_eq!(tables[0].payload(), table.payload());
        let section_events = events
            .iter()
            .filter(|e| matches!(e, DemuxEvent::SectionCompleted { .. }))
            .count();
        assert_eq!(section_events, 3);
    }

    #[test]
    fn version_supersession_emits_only_new_content() {
        let v1 = Section::build(0x42, 0x0001, 1, 0, 0, &[0xAA]).unwrap();
        let v2 = Section::build(0x42, 0x0001, 2, 0, 0, &[0xBB]).unwrap();

        let mut demux = SectionDemux::new();
        let mut events = Vec::new();
        for pkt in packets_for(0x200, &[v1, v2]) {
            events.extend(demux.process(&pkt));
        }

        let tables = completed_tables(&events);
        // both are single-section tables, so both complete; the version-2
        // content is what the last table event carries
        assert_eq!(tables.last().map(|t| t.version), Some(2));
        assert_eq!(tables.last().map(|t| t.payload()), Some(vec![0xBB]));
    }

    #[test]
    fn incomplete_old_version_is_never_emitted() {
        // part 0 of a two-part version-1 table, then a complete version 2
        let v1_part = Section::build(0x42, 0x0001, 1, 0, 1, &[0x01]).unwrap();
        let v2 = vec![
            Section::build(0x42, 0x0001, 2, 0, 1, &[0x02]).unwrap(),
            Section::build(0x42, 0x0001, 2, 1, 1, &[0x03]).unwrap(),
        ];

        let mut demux = SectionDemux::new();
        let mut events = Vec::new();
        let mut cc = 0u8;
        for sections in [vec![v1_part], v2] {
            for mut pkt in packets_for(0x200, &sections) {
                pkt.continuity_counter = cc;
                cc = (cc + 1) % 16;
                events.extend(demux.process(&pkt));
            }
        }

        let tables = completed_tables(&events);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].version, 2);
    }

    #[test]
    fn pids_are_isolated() {
        let a = Section::build(0x42, 1, 0, 0, 0, &[1]).unwrap();
        let b = Section::build(0x42, 2, 0, 0, 0, &[2]).unwrap();

        let mut demux = SectionDemux::new();
        let mut events = Vec::new();
        for pkt in packets_for(0x100, &[a]) {
            events.extend(demux.process(&pkt));
        }
        for pkt in packets_for(0x101, &[b]) {
            events.extend(demux.process(&pkt));
        }

        assert_eq!(completed_tables(&events).len(), 2);
        assert_eq!(demux.observed_pids(), vec![0x100, 0x101]);
    }

    #[test]
    fn null_pid_is_ignored() {
        let mut demux = SectionDemux::new();
        assert!(demux.process(&TsPacket::null()).is_empty());
        assert!(demux.observed_pids().is_empty());
    }

    #[test]
    fn reset_discards_partial_state() {
        let big = Section::build(0x42, 1, 0, 0, 0, &vec![0x77; 600]).unwrap();
        let pkts = packets_for(0x100, std::slice::from_ref(&big));

        let mut demux = SectionDemux::new();
        demux.process(&pkts[0]);
        demux.reset(0x100);
        // remaining packets can no longer close the section
        let mut events = Vec::new();
        for pkt in &pkts[1..] {
            events.extend(demux.process(pkt));
        }
        assert!(completed_tables(&events).is_empty());
    }

    #[test]
    fn duplicate_packet_produces_no_duplicate_events() {
        let sec = Section::build(0x42, 1, 0, 0, 0, &[5]).unwrap();
        let pkts = packets_for(0x100, &[sec]);

        let mut demux = SectionDemux::new();
        let first = demux.process(&pkts[0]);
        let replay = demux.process(&pkts[0]);
        assert_eq!(
            first
                .iter()
                .filter(|e| matches!(e, DemuxEvent::SectionCompleted { .. }))
                .count(),
            1
        );
        assert!(replay.is_empty());
    }
}
