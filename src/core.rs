//! Live pipeline: UDP datagrams → packet framing → section demux →
//! periodic JSON snapshot.

use std::time::{Duration, Instant};

use crate::constants::{TS_PACKET_SIZE, TS_SYNC_BYTE};
use crate::demux::SectionDemux;
use crate::network::bind_packet_source;
use crate::packet::TsPacket;
use crate::report::Reporter;
use crate::stats::StatsManager;
use crate::types::Options;

pub async fn run(opts: Options) -> anyhow::Result<()> {
    let sock = bind_packet_source(opts.addr)?;

    let mut buf = [0u8; 2048];
    let mut demux = SectionDemux::new();
    let mut stats = StatsManager::new();
    let mut last_print = Instant::now();

    loop {
        let n = tokio::select! {
            recv = sock.recv_from(&mut buf) => recv?.0,
            _ = tokio::signal::ctrl_c() => break,
        };
        if n == 0 {
            continue;
        }

        // iterate TS packets (188 B aligned)
        for chunk in buf[..n].chunks_exact(TS_PACKET_SIZE) {
            if chunk[0] != TS_SYNC_BYTE {
                continue; // bad sync
            }
            let pkt = match TsPacket::parse(chunk) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if opts.pid_filter.is_some_and(|pid| pid != pkt.pid) {
                continue;
            }
            stats.record_packet(pkt.pid);
            for event in demux.process(&pkt) {
                stats.record_event(&event);
            }
        }

        if last_print.elapsed() >= Duration::from_secs(opts.refresh_secs) {
            println!("{}", Reporter::generate_json_report(&stats));
            last_print = Instant::now();
        }
    }

    // abort is cooperative; in-flight partial sections are simply dropped
    println!("{}", Reporter::generate_json_report(&stats));
    Ok(())
}
