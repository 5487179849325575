//! Shared types: demux events and pipeline options.

use std::net::SocketAddr;

use crate::demux::Table;
use crate::section::Section;

/// Why a collected byte run was thrown away instead of surfacing as a
/// section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    CrcMismatch,
    /// section_length field above the 4093-byte bound.
    SectionTooLong,
    /// section_length field below the minimum for a header plus CRC.
    SectionTooShort,
    /// Pointer byte past the end of the packet payload.
    BadPointer,
}

impl ValidationFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationFailure::CrcMismatch => "crc_mismatch",
            ValidationFailure::SectionTooLong => "section_too_long",
            ValidationFailure::SectionTooShort => "section_too_short",
            ValidationFailure::BadPointer => "bad_pointer",
        }
    }
}

/// Observable outcome of feeding one packet to the demux.
///
/// Recoverable stream noise is reported here, never as an `Err`; errors
/// are reserved for caller contract violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemuxEvent {
    SectionCompleted { pid: u16, section: Section },
    TableCompleted { pid: u16, table: Table },
    ValidationFailure { pid: u16, reason: ValidationFailure },
    Discontinuity { pid: u16, expected: u8, actual: u8 },
    ScrambledPayload { pid: u16 },
}

/// Configuration for the live pipeline (`pipeline::run`).
pub struct Options {
    /// UDP socket to bind + listen (IPv4, unicast or multicast)
    pub addr: SocketAddr,
    /// Refresh interval for the JSON snapshot
    pub refresh_secs: u64,
    /// Only demux this PID when set
    pub pid_filter: Option<u16>,
}
