// Time conversions intentionally lose precision for display purposes
#![allow(clippy::cast_precision_loss)]

use std::collections::HashMap;

use super::{Completeness, EventKind, LogicalEvent};

/// Counters accumulated across every batch a decoder has seen
#[derive(Debug, Default, Clone)]
pub struct DecodeStats {
    pub batches: u64,
    pub samples: u64,
    pub events: HashMap<EventKind, u64>,
    /// Compute-unit ends synthesized by reconciliation
    pub approximated: u64,
    /// Burst ends dropped because no start was pending (emulation flow)
    pub unmatched_ends: u64,
    /// Bursts dropped because the end preceded the start in host time
    pub suppressed: u64,
    pub heartbeats: u64,
    /// Samples whose trace id is outside every known band
    pub unclassified: u64,
    pub training_samples: u64,
}

impl DecodeStats {
    pub(crate) fn record_batch(&mut self, samples: usize, events: &[LogicalEvent]) {
        self.batches += 1;
        self.samples += samples as u64;
        for event in events {
            *self.events.entry(event.kind).or_default() += 1;
        }
    }

    /// Total events emitted across all kinds
    #[must_use]
    pub fn total_events(&self) -> u64 {
        self.events.values().sum()
    }
}

/// Render one event as a single line
#[must_use]
pub fn format_event(event: &LogicalEvent) -> String {
    let marker = match event.completeness {
        Completeness::Full => "",
        Completeness::Approximated => " (approx)",
    };
    let burst = if event.kind.is_memory() {
        format!(" burst={}", event.burst_length)
    } else {
        String::new()
    };

    format!(
        "[{}] {} {}..{} {:.6}ms..{:.6}ms{burst}{marker}",
        event.kind,
        event.channel,
        event.start_cycles.0,
        event.end_cycles.0,
        event.start_ms,
        event.end_ms,
    )
}

/// Display decode statistics
pub fn display_statistics(stats: &DecodeStats) {
    eprintln!(
        "stats: batches={} samples={} events={} approximated={} unmatched_ends={} \
         suppressed={} heartbeats={} unclassified={}",
        stats.batches,
        stats.samples,
        stats.total_events(),
        stats.approximated,
        stats.unmatched_ends,
        stats.suppressed,
        stats.heartbeats,
        stats.unclassified,
    );
    for kind in EventKind::ALL {
        if let Some(count) = stats.events.get(&kind) {
            eprintln!("  {kind}: {count}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelId, DeviceCycles};

    #[test]
    fn test_format_memory_event() {
        let event = LogicalEvent::span(
            EventKind::Read,
            ChannelId::memory(2),
            (DeviceCycles(10), DeviceCycles(13)),
            (0.5, 0.75),
        );
        assert_eq!(format_event(&event), "[Read] memory/2 10..13 0.500000ms..0.750000ms burst=4");
    }

    #[test]
    fn test_format_approximated_kernel() {
        let event = LogicalEvent::span(
            EventKind::Kernel,
            ChannelId::accelerator(0),
            (DeviceCycles(1), DeviceCycles(9)),
            (1.0, 2.0),
        )
        .approximated();
        assert_eq!(format_event(&event), "[Kernel] accel/0 1..9 1.000000ms..2.000000ms (approx)");
    }

    #[test]
    fn test_stats_count_by_kind() {
        let write = LogicalEvent::span(
            EventKind::Write,
            ChannelId::memory(0),
            (DeviceCycles(0), DeviceCycles(1)),
            (0.0, 0.0),
        );
        let mut stats = DecodeStats::default();
        stats.record_batch(5, &[write.clone(), write]);
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.samples, 5);
        assert_eq!(stats.events[&EventKind::Write], 2);
        assert_eq!(stats.total_events(), 2);
    }
}
