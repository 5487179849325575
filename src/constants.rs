//! Constants for MPEG-TS packet framing and PSI/SI section handling

/// MPEG-TS packet constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_SYNC_BYTE: u8 = 0x47;

/// Usable payload bytes in a packet with no adaptation field
pub const TS_PAYLOAD_MAX: usize = 184;

/// PID range and reserved values
pub const PID_MAX: u16 = 0x1FFF;
pub const PID_NULL: u16 = 0x1FFF;

/// Continuity counter wraps mod 16
pub const CC_MODULUS: u8 = 16;

/// Section framing: 3-byte prefix (table_id + length), 8-byte header
/// including the prefix, trailing CRC-32
pub const SECTION_PREFIX_SIZE: usize = 3;
pub const SECTION_HEADER_SIZE: usize = 8;
pub const SECTION_CRC_SIZE: usize = 4;

/// Bounds on the section_length field (ISO/IEC 13818-1 private sections)
pub const SECTION_LENGTH_MAX: usize = 4093;
pub const SECTION_LENGTH_MIN: usize =
    SECTION_HEADER_SIZE - SECTION_PREFIX_SIZE + SECTION_CRC_SIZE;

/// Largest on-wire section image: 3-byte prefix + max section_length
pub const SECTION_SIZE_MAX: usize = SECTION_PREFIX_SIZE + SECTION_LENGTH_MAX;

/// Fill byte between/after sections inside a packet payload
pub const STUFFING_BYTE: u8 = 0xFF;
