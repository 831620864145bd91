//! Logical transaction records produced by the decoder

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

use crate::domain::{ChannelId, DeviceCycles};

/// Kind of reconstructed transaction
///
/// Serialized with the exact labels timeline renderers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    #[serde(rename = "Read")]
    Read,
    #[serde(rename = "Write")]
    Write,
    #[serde(rename = "Kernel")]
    Kernel,
    #[serde(rename = "Intra-Kernel Dataflow Stall")]
    StallIntraKernel,
    #[serde(rename = "Inter-Kernel Pipe Stall")]
    StallInterKernel,
    #[serde(rename = "External Memory Stall")]
    StallExternalMemory,
}

impl EventKind {
    /// Every kind, in display order
    pub const ALL: [EventKind; 6] = [
        EventKind::Kernel,
        EventKind::Read,
        EventKind::Write,
        EventKind::StallIntraKernel,
        EventKind::StallInterKernel,
        EventKind::StallExternalMemory,
    ];

    /// Type label consumed by timeline renderers
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            EventKind::Read => "Read",
            EventKind::Write => "Write",
            EventKind::Kernel => "Kernel",
            EventKind::StallIntraKernel => "Intra-Kernel Dataflow Stall",
            EventKind::StallInterKernel => "Inter-Kernel Pipe Stall",
            EventKind::StallExternalMemory => "External Memory Stall",
        }
    }

    /// Whether this kind describes a memory burst
    #[must_use]
    pub fn is_memory(self) -> bool {
        matches!(self, EventKind::Read | EventKind::Write)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether an event's end was observed or inferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    /// Start and end both observed
    Full,
    /// End inferred at end of batch from surrounding activity
    Approximated,
}

/// One reconstructed transaction on the host timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalEvent {
    pub kind: EventKind,
    pub channel: ChannelId,
    /// Start in device cycles (after overflow correction)
    pub start_cycles: DeviceCycles,
    /// End in device cycles (after overflow correction)
    pub end_cycles: DeviceCycles,
    /// Start in host milliseconds
    pub start_ms: f64,
    /// End in host milliseconds
    pub end_ms: f64,
    /// Device-cycle span + 1 for memory bursts, 0 otherwise
    pub burst_length: u64,
    pub completeness: Completeness,
}

impl LogicalEvent {
    /// Build a fully observed span; burst length is derived for memory kinds
    #[must_use]
    pub fn span(
        kind: EventKind,
        channel: ChannelId,
        (start_cycles, end_cycles): (DeviceCycles, DeviceCycles),
        (start_ms, end_ms): (f64, f64),
    ) -> Self {
        let burst_length = if kind.is_memory() { end_cycles.span_from(start_cycles) } else { 0 };
        Self {
            kind,
            channel,
            start_cycles,
            end_cycles,
            start_ms,
            end_ms,
            burst_length,
            completeness: Completeness::Full,
        }
    }

    #[must_use]
    pub fn approximated(mut self) -> Self {
        self.completeness = Completeness::Approximated;
        self
    }

    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }
}

/// Output sequence of one decode call.
///
/// Ordering guarantee: compute-unit spans from the hardware flow, including
/// approximated ones, are placed ahead of every data-transfer and stall span
/// produced in the same call. Everything else keeps arrival order.
#[derive(Debug, Default)]
pub(crate) struct EventSink {
    events: VecDeque<LogicalEvent>,
}

impl EventSink {
    pub(crate) fn push_front(&mut self, event: LogicalEvent) {
        self.events.push_front(event);
    }

    pub(crate) fn push_back(&mut self, event: LogicalEvent) {
        self.events.push_back(event);
    }

    pub(crate) fn into_events(self) -> Vec<LogicalEvent> {
        self.events.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_verbatim() {
        let labels: Vec<&str> = EventKind::ALL.iter().map(|k| k.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Kernel",
                "Read",
                "Write",
                "Intra-Kernel Dataflow Stall",
                "Inter-Kernel Pipe Stall",
                "External Memory Stall",
            ]
        );
    }

    #[test]
    fn test_serialized_kind_uses_label() {
        let json = serde_json::to_string(&EventKind::StallInterKernel).unwrap();
        assert_eq!(json, "\"Inter-Kernel Pipe Stall\"");
    }

    #[test]
    fn test_burst_length_only_for_memory() {
        let cycles = (DeviceCycles(100), DeviceCycles(107));
        let read = LogicalEvent::span(EventKind::Read, ChannelId::memory(1), cycles, (0.0, 1.0));
        assert_eq!(read.burst_length, 8);
        let kernel =
            LogicalEvent::span(EventKind::Kernel, ChannelId::accelerator(0), cycles, (0.0, 1.0));
        assert_eq!(kernel.burst_length, 0);
        assert_eq!(kernel.approximated().completeness, Completeness::Approximated);
    }

    #[test]
    fn test_sink_front_and_back() {
        let ev = |slot| {
            LogicalEvent::span(
                EventKind::Write,
                ChannelId::memory(slot),
                (DeviceCycles(0), DeviceCycles(0)),
                (0.0, 0.0),
            )
        };
        let mut sink = EventSink::default();
        sink.push_back(ev(1));
        sink.push_front(ev(2));
        sink.push_back(ev(3));
        let slots: Vec<usize> = sink.into_events().iter().map(|e| e.channel.slot.0).collect();
        assert_eq!(slots, vec![2, 1, 3]);
    }
}
