//! JSON snapshot of the demux state for CLI output.

use serde::Serialize;

use crate::stats::StatsManager;

/// JSON structure for one PID (internal serialization)
#[derive(Serialize)]
struct PidJson {
    pid: u16,
    packets: u64,
    sections: u64,
    tables: u64,
    crc_errors: u64,
    discontinuities: u64,
    scrambled_skipped: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sections_per_sec: Option<f64>,
}

/// JSON structure for the complete snapshot (internal serialization)
#[derive(Serialize)]
struct ReportJson {
    ts_time: String,
    pids: Vec<PidJson>,
    total_packets: u64,
    total_tables: u64,
}

/// Report generator for demux statistics
pub struct Reporter;

impl Reporter {
    /// Generate pretty-printed JSON for the current counters
    pub fn generate_json_report(stats: &StatsManager) -> String {
        let mut pids: Vec<PidJson> = stats
            .iter()
            .map(|(pid, s)| PidJson {
                pid: *pid,
                packets: s.packets,
                sections: s.sections,
                tables: s.tables,
                crc_errors: s.crc_errors + s.other_validation_errors,
                discontinuities: s.discontinuities,
                scrambled_skipped: s.scrambled_skipped,
                sections_per_sec: stats.section_rate(*pid).filter(|r| *r > 0.0),
            })
            .collect();
        pids.sort_by_key(|p| p.pid);

        let rep = ReportJson {
            ts_time: chrono::Utc::now().to_rfc3339(),
            total_packets: pids.iter().map(|p| p.packets).sum(),
            total_tables: pids.iter().map(|p| p.tables).sum(),
            pids,
        };
        serde_json::to_string_pretty(&rep)
            .unwrap_or_else(|_| "{\"error\": \"JSON serialization failed\"}".to_string())
    }
}
