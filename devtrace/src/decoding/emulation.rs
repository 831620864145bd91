//! Emulation flow: every sample carries its own host timestamp.
//!
//! Device timestamps are deltas against a running per-group offset.
//! Memory monitors report first/last beat flags; accelerator monitors
//! report only the compute-unit toggle.

#![allow(clippy::cast_precision_loss)]

use log::debug;

use devtrace_common::{
    RawSample, ACCEL_CU_MASK, EMU_ACCEL_ID_FIRST, EMU_ACCEL_ID_LAST, EMU_HEARTBEAT_CYCLES,
    EMU_MEMORY_ID_BOUND,
};

use super::channel::{AccelToggle, Direction, PendingStart};
use super::{Decoder, EventKind, EventSink, LogicalEvent};
use crate::diagnostics::Severity;
use crate::domain::{ChannelId, DeviceCycles, MonitorGroup};

impl Decoder<'_> {
    pub(super) fn decode_emulation(
        &mut self,
        batch: &[RawSample],
        group: MonitorGroup,
        sink: &mut EventSink,
    ) {
        if let Some(batch_min) = batch.iter().map(|s| s.host_timestamp).min() {
            self.baseline.rebase(batch_min);
        }

        let mut prev_host: Option<u64> = None;

        for sample in batch {
            let offset = &mut self.emu_offsets[group.index()];
            let mut corrected = sample.timestamp.wrapping_add(*offset);
            if sample.overflowed() {
                corrected = corrected.wrapping_add(self.config.emu_wrap_cycles);
            }
            *offset = corrected;

            if prev_host == Some(sample.host_timestamp) && sample.timestamp == EMU_HEARTBEAT_CYCLES
            {
                debug!("Ignoring heartbeat at host timestamp {:#x}", sample.host_timestamp);
                self.stats.heartbeats += 1;
                continue;
            }
            prev_host = Some(sample.host_timestamp);

            let now = DeviceCycles(corrected);
            // Kept absolute until emission; the baseline can still move down
            let host_ns = sample.host_timestamp;

            match sample.trace_id {
                id if id < EMU_MEMORY_ID_BOUND => {
                    self.emulated_memory(id as usize / 2, sample, now, host_ns, sink);
                }
                id @ EMU_ACCEL_ID_FIRST..=EMU_ACCEL_ID_LAST => {
                    self.emulated_accel((id - EMU_ACCEL_ID_FIRST) as usize, sample, now, host_ns, sink);
                }
                _ => self.stats.unclassified += 1,
            }
        }
    }

    fn emulated_memory(
        &mut self,
        slot: usize,
        sample: &RawSample,
        now: DeviceCycles,
        host_ns: u64,
        sink: &mut EventSink,
    ) {
        debug!("memory slot {slot} event flags = {:07b} @ {now}", sample.event_flags);
        let channel_id = ChannelId::memory(slot);

        // Out-of-order completion is not supported: ends pair with the oldest start
        for direction in [Direction::Write, Direction::Read] {
            let queue = self.channels.memory[slot].queue_mut(direction);

            if sample.flag(direction.first_flag()) {
                queue.push(PendingStart { device: now, host_ns: Some(host_ns) });
            }

            if !sample.flag(direction.last_flag()) {
                continue;
            }

            let Some(start) = queue.pop() else {
                self.stats.unmatched_ends += 1;
                self.diagnostics.emit(
                    Severity::Warning,
                    &format!(
                        "Found {direction} end with {direction} start queue empty on {channel_id} @ {now}"
                    ),
                );
                // The rest of this sample is not examined
                return;
            };

            let start_host = start.host_ns.unwrap_or(host_ns);
            if host_ns < start_host {
                self.stats.suppressed += 1;
                continue;
            }

            let start_ms = self.baseline.elapsed_ms(start_host);
            let mut end_ms = self.baseline.elapsed_ms(host_ns);
            if host_ns == start_host {
                end_ms += self.emu_cycle_ms;
            }

            sink.push_back(LogicalEvent::span(
                direction.kind(),
                channel_id,
                (start.device, now),
                (start_ms, end_ms),
            ));
        }
    }

    fn emulated_accel(
        &mut self,
        slot: usize,
        sample: &RawSample,
        now: DeviceCycles,
        host_ns: u64,
        sink: &mut EventSink,
    ) {
        if u32::from(sample.event_flags) & ACCEL_CU_MASK == 0 {
            return;
        }

        let channel = &mut self.channels.accel[slot];
        if channel.is_started(AccelToggle::ComputeUnit) {
            let start = channel.pending(AccelToggle::ComputeUnit);
            let start_ms = self.baseline.elapsed_ms(channel.cu_host_start_ns);
            let end_ms = self.baseline.elapsed_ms(host_ns);

            sink.push_back(LogicalEvent::span(
                EventKind::Kernel,
                ChannelId::accelerator(slot),
                (start, now),
                (start_ms, end_ms),
            ));

            // Halved to stay below the true cycle time
            let cycles = now.0.saturating_sub(start.0);
            if cycles > 0 {
                self.emu_cycle_ms = (end_ms - start_ms) / (2.0 * cycles as f64);
            }
        } else {
            channel.set_pending(AccelToggle::ComputeUnit, now);
            channel.cu_host_start_ns = host_ns;
        }

        channel.toggle(ACCEL_CU_MASK);
        channel.last_activity = now;
    }
}
