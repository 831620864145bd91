//! # Shared Data Structures (Device ↔ Host)
//!
//! Defines the fixed-format trace sample produced by the accelerator's
//! performance monitors and every wire-level constant needed to interpret it.
//! The record uses `#[repr(C)]` so dumps written by the acquisition layer can
//! be read back byte-for-byte.
//!
//! ## Monitor Kinds
//!
//! 1. **Memory monitors** - one slot per memory port, report read/write bursts
//! 2. **Accelerator monitors** - one slot per compute unit, report execution
//!    and three stall categories as toggles
//!
//! ## Key Types
//!
//! - [`RawSample`] - One trace word as offloaded from the device FIFO

#![no_std]

// ============================================================================
// Event Type Constants
// ============================================================================

/// **Memory Monitor**: Burst started (hardware flow only)
///
/// Paired with: `EVENT_TYPE_END`
pub const EVENT_TYPE_START: u8 = 0x4;

/// **Memory Monitor**: Burst finished (hardware flow only)
///
/// Paired with: `EVENT_TYPE_START`
pub const EVENT_TYPE_END: u8 = 0x5;

// ============================================================================
// Memory Monitor Flag Bits (emulation flow)
// ============================================================================

/// Bit position: first beat of a write burst
pub const FLAG_WRITE_FIRST: u8 = 1;

/// Bit position: last beat of a write burst
pub const FLAG_WRITE_LAST: u8 = 2;

/// Bit position: first beat of a read burst
pub const FLAG_READ_FIRST: u8 = 5;

/// Bit position: last beat of a read burst
pub const FLAG_READ_LAST: u8 = 6;

// ============================================================================
// Accelerator Monitor Event Masks
// ============================================================================

/// Compute unit active toggle
pub const ACCEL_CU_MASK: u32 = 0x1;

/// Intra-kernel dataflow stall toggle
pub const ACCEL_STALL_INT_MASK: u32 = 0x2;

/// Inter-kernel pipe stall toggle
pub const ACCEL_STALL_STR_MASK: u32 = 0x4;

/// External memory stall toggle
pub const ACCEL_STALL_EXT_MASK: u32 = 0x8;

/// All four accelerator toggles (the low nibble of a trace id)
pub const ACCEL_EVENT_MASK: u32 = 0xf;

// ============================================================================
// Trace ID Bands
// ============================================================================

/// Hardware flow: first memory monitor trace id (slot = id / 2)
pub const HW_MEMORY_ID_FIRST: u32 = 2;

/// Hardware flow: last memory monitor trace id
pub const HW_MEMORY_ID_LAST: u32 = 61;

/// Hardware flow: first accelerator monitor trace id (slot = (id - 64) / 16)
pub const HW_ACCEL_ID_FIRST: u32 = 64;

/// Hardware flow: last accelerator monitor trace id
pub const HW_ACCEL_ID_LAST: u32 = 544;

/// Hardware flow: trace ids reserved per accelerator slot
pub const HW_ACCEL_IDS_PER_SLOT: u32 = 16;

/// Emulation flow: memory ids are everything below this bound (slot = id / 2)
pub const EMU_MEMORY_ID_BOUND: u32 = 61;

/// Emulation flow: first accelerator id (slot = id - 64)
pub const EMU_ACCEL_ID_FIRST: u32 = 64;

/// Emulation flow: last accelerator id
pub const EMU_ACCEL_ID_LAST: u32 = 94;

// ============================================================================
// Limits
// ============================================================================

/// Memory monitor slots addressable by either flow
pub const MAX_MEMORY_SLOTS: usize = 31;

/// Accelerator monitor slots addressable by either flow
pub const MAX_ACCEL_SLOTS: usize = 31;

/// Default cap on samples processed per session
pub const DEFAULT_MAX_TRACE_EVENTS: u64 = 0x4_0000;

/// Depth of the hardware trace FIFO; a batch this large means samples were lost
pub const TRACE_FIFO_DEPTH: usize = 8192;

/// Wraparound added on overflow in the emulation flow
pub const EMU_WRAP_CYCLES: u64 = 1 << 16;

/// Wraparound added on overflow in the hardware flow
pub const HW_WRAP_CYCLES: u64 = 1 << 23;

/// Device timestamp carried by emulation heartbeat samples
pub const EMU_HEARTBEAT_CYCLES: u64 = 1;

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Size of one encoded [`RawSample`] in bytes
pub const SAMPLE_SIZE: usize = 24;

/// One trace word from a performance monitor FIFO
///
/// **Memory Layout**: `#[repr(C)]`, 24 bytes, little-endian on disk
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawSample {
    /// Device cycle counter (fixed width on the device, wraps)
    pub timestamp: u64,

    /// Host timestamp in nanoseconds
    ///
    /// **Value**:
    /// - Emulation flow: present on every sample
    /// - Hardware flow: only meaningful on the two clock-training samples
    pub host_timestamp: u64,

    /// Monitor/source identifier (see the `*_ID_*` bands)
    pub trace_id: u32,

    /// Memory monitor flags (emulation flow) or accelerator toggles
    pub event_flags: u8,

    /// `EVENT_TYPE_START` or `EVENT_TYPE_END` (hardware memory monitors)
    pub event_type: u8,

    /// 1 if the device counter wrapped before this sample
    pub overflow: u8,

    /// 1 marks a single-beat (zero-length) transaction
    pub reserved: u8,
}

impl RawSample {
    /// Decode one record from its little-endian byte form
    #[must_use]
    pub fn from_le_bytes(bytes: &[u8; SAMPLE_SIZE]) -> Self {
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&bytes[0..8]);
        let mut host = [0u8; 8];
        host.copy_from_slice(&bytes[8..16]);
        let mut id = [0u8; 4];
        id.copy_from_slice(&bytes[16..20]);

        Self {
            timestamp: u64::from_le_bytes(ts),
            host_timestamp: u64::from_le_bytes(host),
            trace_id: u32::from_le_bytes(id),
            event_flags: bytes[20],
            event_type: bytes[21],
            overflow: bytes[22],
            reserved: bytes[23],
        }
    }

    /// Encode this record in its little-endian byte form
    #[must_use]
    pub fn to_le_bytes(&self) -> [u8; SAMPLE_SIZE] {
        let mut out = [0u8; SAMPLE_SIZE];
        out[0..8].copy_from_slice(&self.timestamp.to_le_bytes());
        out[8..16].copy_from_slice(&self.host_timestamp.to_le_bytes());
        out[16..20].copy_from_slice(&self.trace_id.to_le_bytes());
        out[20] = self.event_flags;
        out[21] = self.event_type;
        out[22] = self.overflow;
        out[23] = self.reserved;
        out
    }

    /// Whether flag bit `bit` is set in `event_flags`
    #[must_use]
    pub fn flag(&self, bit: u8) -> bool {
        (self.event_flags >> bit) & 0x1 == 1
    }

    /// Whether the overflow marker is set
    #[must_use]
    pub fn overflowed(&self) -> bool {
        self.overflow == 1
    }

    /// Whether the degenerate (single-beat) marker is set
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.reserved == 1
    }
}
