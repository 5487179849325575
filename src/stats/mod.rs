//! Per-PID counters for demux observability.

use std::collections::HashMap;
use std::time::Instant;

use crate::types::{DemuxEvent, ValidationFailure};

/// Rolling counters for one PID
pub struct PidStats {
    pub packets: u64,
    pub sections: u64,
    pub tables: u64,
    pub crc_errors: u64,
    pub other_validation_errors: u64,
    pub discontinuities: u64,
    pub scrambled_skipped: u64,
    pub start: Instant,
}

impl PidStats {
    fn new() -> Self {
        Self {
            packets: 0,
            sections: 0,
            tables: 0,
            crc_errors: 0,
            other_validation_errors: 0,
            discontinuities: 0,
            scrambled_skipped: 0,
            start: Instant::now(),
        }
    }
}

/// Manages per-PID statistics across the demux run
#[derive(Default)]
pub struct StatsManager {
    pub pid_stats: HashMap<u16, PidStats>,
}

impl StatsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_packet(&mut self, pid: u16) {
        self.pid_stats.entry(pid).or_insert_with(PidStats::new).packets += 1;
    }

    pub fn record_event(&mut self, event: &DemuxEvent) {
        let pid = match event {
            DemuxEvent::SectionCompleted { pid, .. }
            | DemuxEvent::TableCompleted { pid, .. }
            | DemuxEvent::ValidationFailure { pid, .. }
            | DemuxEvent::Discontinuity { pid, .. }
            | DemuxEvent::ScrambledPayload { pid } => *pid,
        };
        let stats = self.pid_stats.entry(pid).or_insert_with(PidStats::new);
        match event {
            DemuxEvent::SectionCompleted { .. } => stats.sections += 1,
            DemuxEvent::TableCompleted { .. } => stats.tables += 1,
            DemuxEvent::ValidationFailure { reason, .. } => match reason {
                ValidationFailure::CrcMismatch => stats.crc_errors += 1,
                _ => stats.other_validation_errors += 1,
            },
            DemuxEvent::Discontinuity { .. } => stats.discontinuities += 1,
            DemuxEvent::ScrambledPayload { .. } => stats.scrambled_skipped += 1,
        }
    }

    pub fn get(&self, pid: u16) -> Option<&PidStats> {
        self.pid_stats.get(&pid)
    }

    /// Completed sections per second since the PID was first seen
    pub fn section_rate(&self, pid: u16) -> Option<f64> {
        let stats = self.pid_stats.get(&pid)?;
        let seconds = stats.start.elapsed().as_secs_f64().max(0.1);
        Some(stats.sections as f64 / seconds)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u16, &PidStats)> {
        self.pid_stats.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_land_in_the_right_counter() {
        let mut mgr = StatsManager::new();
        mgr.record_packet(0x100);
        mgr.record_event(&DemuxEvent::Discontinuity { pid: 0x100, expected: 1, actual: 5 });
        mgr.record_event(&DemuxEvent::ScrambledPayload { pid: 0x100 });
        mgr.record_event(&DemuxEvent::ValidationFailure {
            pid: 0x100,
            reason: ValidationFailure::CrcMismatch,
        });

        let stats = mgr.get(0x100).unwrap();
        assert_eq!(stats.packets, 1);
        assert_eq!(stats.discontinuities, 1);
        assert_eq!(stats.scrambled_skipped, 1);
        assert_eq!(stats.crc_errors, 1);
        assert_eq!(stats.sections, 0);
    }

    #[test]
    fn pids_are_tracked_independently() {
        let mut mgr = StatsManager::new();
        mgr.record_packet(0x100);
        mgr.record_packet(0x200);
        mgr.record_packet(0x200);
        assert_eq!(mgr.get(0x100).unwrap().packets, 1);
        assert_eq!(mgr.get(0x200).unwrap().packets, 2);
        assert!(mgr.get(0x300).is_none());
    }
}
