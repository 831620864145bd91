//! Per-channel correlation state
//!
//! Every (channel, direction) pair is a two-state machine:
//!
//! ```text
//!            start                      end
//!   idle ──────────▶ pending-start ──────────▶ idle   (event emitted)
//!    │
//!    └── end ──▶ zero-length event or warned drop (depends on flow)
//! ```
//!
//! State lives in fixed tables indexed by slot so the decode loop never
//! allocates per channel. Queues only allocate once a start is pending.

use std::collections::VecDeque;
use std::fmt;

use devtrace_common::{
    ACCEL_CU_MASK, ACCEL_STALL_EXT_MASK, ACCEL_STALL_INT_MASK, ACCEL_STALL_STR_MASK,
    FLAG_READ_FIRST, FLAG_READ_LAST, FLAG_WRITE_FIRST, FLAG_WRITE_LAST, MAX_ACCEL_SLOTS,
    MAX_MEMORY_SLOTS,
};

use super::EventKind;
use crate::domain::DeviceCycles;

/// Direction of a memory burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    #[must_use]
    pub fn kind(self) -> EventKind {
        match self {
            Direction::Read => EventKind::Read,
            Direction::Write => EventKind::Write,
        }
    }

    /// Flag bit marking the first beat (emulation flow)
    pub(crate) fn first_flag(self) -> u8 {
        match self {
            Direction::Read => FLAG_READ_FIRST,
            Direction::Write => FLAG_WRITE_FIRST,
        }
    }

    /// Flag bit marking the last beat (emulation flow)
    pub(crate) fn last_flag(self) -> u8 {
        match self {
            Direction::Read => FLAG_READ_LAST,
            Direction::Write => FLAG_WRITE_LAST,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => write!(f, "read"),
            Direction::Write => write!(f, "write"),
        }
    }
}

/// Start of a burst that has not been matched yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingStart {
    pub device: DeviceCycles,
    /// Absolute host time in ns; emulation flow only
    pub host_ns: Option<u64>,
}

/// FIFO of unmatched burst starts. Drained strictly in start order.
#[derive(Debug, Default)]
pub(crate) struct BurstQueue {
    starts: VecDeque<PendingStart>,
}

impl BurstQueue {
    pub fn push(&mut self, start: PendingStart) {
        self.starts.push_back(start);
    }

    pub fn pop(&mut self) -> Option<PendingStart> {
        self.starts.pop_front()
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn clear(&mut self) {
        self.starts.clear();
    }
}

/// Correlation state of one memory port
#[derive(Debug, Default)]
pub(crate) struct MemoryChannel {
    reads: BurstQueue,
    writes: BurstQueue,
    /// Device time of the last completed burst
    pub last_activity: DeviceCycles,
}

impl MemoryChannel {
    pub fn queue(&self, direction: Direction) -> &BurstQueue {
        match direction {
            Direction::Read => &self.reads,
            Direction::Write => &self.writes,
        }
    }

    pub fn queue_mut(&mut self, direction: Direction) -> &mut BurstQueue {
        match direction {
            Direction::Read => &mut self.reads,
            Direction::Write => &mut self.writes,
        }
    }
}

/// One of the four activity toggles an accelerator monitor reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelToggle {
    ComputeUnit,
    StallIntraKernel,
    StallInterKernel,
    StallExternalMemory,
}

impl AccelToggle {
    pub const ALL: [AccelToggle; 4] = [
        AccelToggle::ComputeUnit,
        AccelToggle::StallIntraKernel,
        AccelToggle::StallInterKernel,
        AccelToggle::StallExternalMemory,
    ];

    #[must_use]
    pub fn mask(self) -> u32 {
        match self {
            AccelToggle::ComputeUnit => ACCEL_CU_MASK,
            AccelToggle::StallIntraKernel => ACCEL_STALL_INT_MASK,
            AccelToggle::StallInterKernel => ACCEL_STALL_STR_MASK,
            AccelToggle::StallExternalMemory => ACCEL_STALL_EXT_MASK,
        }
    }

    #[must_use]
    pub fn kind(self) -> EventKind {
        match self {
            AccelToggle::ComputeUnit => EventKind::Kernel,
            AccelToggle::StallIntraKernel => EventKind::StallIntraKernel,
            AccelToggle::StallInterKernel => EventKind::StallInterKernel,
            AccelToggle::StallExternalMemory => EventKind::StallExternalMemory,
        }
    }

    fn index(self) -> usize {
        match self {
            AccelToggle::ComputeUnit => 0,
            AccelToggle::StallIntraKernel => 1,
            AccelToggle::StallInterKernel => 2,
            AccelToggle::StallExternalMemory => 3,
        }
    }
}

/// Correlation state of one compute unit
#[derive(Debug, Default)]
pub(crate) struct AccelChannel {
    /// Started bits, laid out like `AccelToggle::mask`
    started: u32,
    pending: [DeviceCycles; 4],
    /// Absolute host ns of the pending compute-unit start (emulation flow)
    pub cu_host_start_ns: u64,
    /// Device time of the last sample seen on this monitor
    pub last_activity: DeviceCycles,
}

impl AccelChannel {
    pub fn is_started(&self, toggle: AccelToggle) -> bool {
        self.started & toggle.mask() != 0
    }

    pub fn pending(&self, toggle: AccelToggle) -> DeviceCycles {
        self.pending[toggle.index()]
    }

    pub fn set_pending(&mut self, toggle: AccelToggle, at: DeviceCycles) {
        self.pending[toggle.index()] = at;
    }

    /// Flip the started bits selected by `mask`
    pub fn toggle(&mut self, mask: u32) {
        self.started ^= mask & devtrace_common::ACCEL_EVENT_MASK;
    }

    #[cfg(test)]
    pub fn started_mask(&self) -> u32 {
        self.started
    }

    pub fn clear_started(&mut self) {
        self.started = 0;
    }
}

/// Fixed-size channel tables for one device
#[derive(Debug)]
pub(crate) struct ChannelTable {
    pub memory: [MemoryChannel; MAX_MEMORY_SLOTS],
    pub accel: [AccelChannel; MAX_ACCEL_SLOTS],
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self {
            memory: std::array::from_fn(|_| MemoryChannel::default()),
            accel: std::array::from_fn(|_| AccelChannel::default()),
        }
    }
}

impl ChannelTable {
    /// Reset every accelerator's started bits; pending queues are kept
    pub fn clear_started(&mut self) {
        for channel in &mut self.accel {
            channel.clear_started();
        }
    }

    /// Drain every queue and forget all activity
    pub fn reset(&mut self) {
        for channel in &mut self.memory {
            channel.reads.clear();
            channel.writes.clear();
            channel.last_activity = DeviceCycles::default();
        }
        for channel in &mut self.accel {
            *channel = AccelChannel::default();
        }
    }
}
