//! Hardware flow: host time only on the clock-training prologue.
//!
//! The first two samples of each monitor group's stream train the clock.
//! After that, trace ids select the monitor:
//!
//! | Trace id   | Monitor     | Slot              | Meaning                       |
//! |------------|-------------|-------------------|-------------------------------|
//! | `2..=61`   | memory      | `id / 2`          | even = write, odd = read      |
//! | `64..=544` | accelerator | `(id - 64) / 16`  | low nibble = toggles          |
//!
//! Anything else is a reserved id and is skipped without a diagnostic.

use log::debug;

use devtrace_common::{
    RawSample, EVENT_TYPE_END, EVENT_TYPE_START, HW_ACCEL_IDS_PER_SLOT, HW_ACCEL_ID_FIRST,
    HW_ACCEL_ID_LAST, HW_MEMORY_ID_FIRST, HW_MEMORY_ID_LAST, MAX_ACCEL_SLOTS,
};

use super::channel::{AccelToggle, Direction, PendingStart};
use super::{Decoder, EventKind, EventSink, LogicalEvent};
use crate::calibration::{LinearFit, TrainingStep};
use crate::diagnostics::Severity;
use crate::domain::{ChannelId, DeviceCycles, MonitorGroup, SlotIndex};

/// Monitor addressed by a hardware trace id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HardwareTarget {
    Memory { slot: usize, direction: Direction },
    Accelerator { slot: usize },
}

/// Map a hardware trace id onto its monitor, or `None` for reserved ids
pub(crate) fn classify_hardware(trace_id: u32) -> Option<HardwareTarget> {
    match trace_id {
        HW_MEMORY_ID_FIRST..=HW_MEMORY_ID_LAST => {
            let direction = if trace_id % 2 == 0 { Direction::Write } else { Direction::Read };
            Some(HardwareTarget::Memory { slot: (trace_id / 2) as usize, direction })
        }
        HW_ACCEL_ID_FIRST..=HW_ACCEL_ID_LAST => Some(HardwareTarget::Accelerator {
            slot: ((trace_id - HW_ACCEL_ID_FIRST) / HW_ACCEL_IDS_PER_SLOT) as usize,
        }),
        _ => None,
    }
}

impl Decoder<'_> {
    pub(super) fn decode_hardware(
        &mut self,
        batch: &[RawSample],
        group: MonitorGroup,
        sink: &mut EventSink,
    ) {
        if batch.len() >= self.config.trace_fifo_depth {
            self.diagnostics.emit(
                Severity::Warning,
                "Trace FIFO is full because of too many events. Timeline trace could be \
                 incomplete. Please use 'coarse' option for data transfer trace or turn off \
                 Stall profiling",
            );
        }

        for sample in batch {
            let Some(fit) = self.calibrator.fit(group) else {
                self.train(group, sample);
                continue;
            };

            let mut timestamp = sample.timestamp;
            if sample.overflowed() {
                timestamp = timestamp.wrapping_add(self.config.hw_wrap_cycles);
            }
            let now = DeviceCycles(timestamp);

            match classify_hardware(sample.trace_id) {
                Some(HardwareTarget::Accelerator { slot }) => {
                    self.hardware_accel(slot, sample.trace_id, now, &fit, sink);
                }
                Some(HardwareTarget::Memory { slot, direction }) => {
                    self.hardware_memory(slot, direction, sample, now, &fit, sink);
                }
                None => self.stats.unclassified += 1,
            }
        }
    }

    fn train(&mut self, group: MonitorGroup, sample: &RawSample) {
        self.stats.training_samples += 1;
        let step = self.calibrator.add_anchor(
            group,
            DeviceCycles(sample.timestamp),
            sample.host_timestamp,
            self.clock,
        );
        match step {
            TrainingStep::NeedMore => {}
            TrainingStep::Calibrated => {
                if let Some(fit) = self.calibrator.fit(group) {
                    self.diagnostics.emit(
                        Severity::Info,
                        &format!(
                            "Clock training for {group}: {:.4} ns/cycle, intercept {:.1} ns",
                            fit.slope, fit.intercept
                        ),
                    );
                }
            }
            TrainingStep::Degenerate => self.diagnostics.emit(
                Severity::Warning,
                &format!(
                    "Clock training samples for {group} share a device timestamp; \
                     using the nominal trace clock rate"
                ),
            ),
        }
    }

    fn hardware_accel(
        &mut self,
        slot: usize,
        trace_id: u32,
        now: DeviceCycles,
        fit: &LinearFit,
        sink: &mut EventSink,
    ) {
        let channel_id = ChannelId::accelerator(slot);
        let channel = &mut self.channels.accel[slot];

        for toggle in AccelToggle::ALL {
            if trace_id & toggle.mask() == 0 {
                continue;
            }

            if channel.is_started(toggle) {
                let start = channel.pending(toggle);
                let event = LogicalEvent::span(
                    toggle.kind(),
                    channel_id,
                    (start, now),
                    (fit.to_host_ms(start), fit.to_host_ms(now)),
                );
                if toggle == AccelToggle::ComputeUnit {
                    sink.push_front(event);
                } else {
                    sink.push_back(event);
                }
            } else {
                channel.set_pending(toggle, now);
            }
        }

        channel.toggle(trace_id);
        channel.last_activity = now;
    }

    fn hardware_memory(
        &mut self,
        slot: usize,
        direction: Direction,
        sample: &RawSample,
        now: DeviceCycles,
        fit: &LinearFit,
        sink: &mut EventSink,
    ) {
        let channel = &mut self.channels.memory[slot];

        match sample.event_type {
            EVENT_TYPE_START => {
                channel.queue_mut(direction).push(PendingStart { device: now, host_ns: None });
            }
            EVENT_TYPE_END => {
                // Single-beat bursts and unmatched ends collapse to zero length
                let start = if sample.is_degenerate() {
                    now
                } else {
                    channel.queue_mut(direction).pop().map_or(now, |pending| pending.device)
                };

                sink.push_back(LogicalEvent::span(
                    direction.kind(),
                    ChannelId::memory(slot),
                    (start, now),
                    (fit.to_host_ms(start), fit.to_host_ms(now)),
                ));
                channel.last_activity = now;
            }
            other => debug!("Ignoring event type {other:#x} on memory slot {slot}"),
        }
    }

    /// Synthesize compute-unit ends that never arrived.
    ///
    /// A compute unit still marked active at the end of the batch is assumed
    /// to have run as long as it or any of its memory ports showed activity.
    pub(super) fn reconcile(&mut self, group: MonitorGroup, sink: &mut EventSink) {
        let Some(fit) = self.calibrator.fit(group) else {
            return;
        };

        for slot in 0..MAX_ACCEL_SLOTS {
            let channel = &self.channels.accel[slot];
            if !channel.is_started(AccelToggle::ComputeUnit) {
                continue;
            }

            let ports_last = self
                .registry
                .associated_memory_slots(self.device(), SlotIndex(slot))
                .into_iter()
                .filter_map(|port| self.channels.memory.get(port.0))
                .map(|port| port.last_activity)
                .max()
                .unwrap_or_default();
            let last = ports_last.max(channel.last_activity);
            if last.0 == 0 {
                continue;
            }

            self.stats.approximated += 1;
            self.diagnostics.emit(
                Severity::Warning,
                "Incomplete CU profile trace detected. Timeline trace will have approximate CU End",
            );

            let start = channel.pending(AccelToggle::ComputeUnit);
            sink.push_front(
                LogicalEvent::span(
                    EventKind::Kernel,
                    ChannelId::accelerator(slot),
                    (start, last),
                    (fit.to_host_ms(start), fit.to_host_ms(last)),
                )
                .approximated(),
            );
        }
    }
}
