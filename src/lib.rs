// src/lib.rs
pub mod pipeline {
    pub use crate::types::Options;

    /// Async entry-point; returns when stopped (Ctrl-C or socket error)
    pub async fn run(opts: Options) -> anyhow::Result<()> {
        crate::core::run(opts).await
    }
}

pub mod constants;
pub mod crc32;
pub mod demux;
pub mod mux;
pub mod packet;
pub mod section;
pub mod types;

mod core;
mod network;
mod report;
mod stats;

pub use demux::{SectionDemux, Table, TableAggregator};
pub use mux::{CycleInterval, CyclingPacketizer, Packetizer};
pub use packet::TsPacket;
pub use section::Section;
pub use types::DemuxEvent;
