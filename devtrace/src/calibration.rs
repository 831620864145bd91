//! # Clock Calibration
//!
//! Device samples are stamped in device clock cycles. To place them on the
//! host timeline the decoder needs a mapping into host time.
//!
//! ## Two-Point Fit (hardware flow)
//!
//! The first two samples of a monitor group's stream carry a host timestamp
//! next to the device cycle count. Each host time is pushed forward by a
//! fixed transport delay, then:
//!
//! ```text
//! slope     = (host2 - host1) / (device2 - device1)     ns per cycle
//! intercept = host2 - slope * device2                   ns
//! ```
//!
//! When the fit is made the calibrator also samples the host clock to record
//! when the program started, so converted times are relative to program
//! start instead of the epoch.
//!
//! ## Direct Mode (emulation flow)
//!
//! Every sample carries its own host timestamp, so no fit is needed.
//! [`HostBaseline`] tracks the smallest host timestamp seen so far and
//! makes every host time relative to it.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::domain::{DeviceCycles, MonitorGroup};

/// Nanoseconds per millisecond
const NS_PER_MS: f64 = 1e6;

/// Source of host time used once per session when a fit is made
pub trait HostClock {
    /// Current host time in nanoseconds, same domain as sample host timestamps
    fn now_ns(&self) -> u64;

    /// Nanoseconds elapsed since the program started
    fn since_program_start_ns(&self) -> u64;
}

/// Host clock backed by the system wall clock and a start `Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemHostClock {
    started: Instant,
}

impl SystemHostClock {
    #[must_use]
    pub fn new() -> Self {
        Self { started: Instant::now() }
    }
}

impl Default for SystemHostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for SystemHostClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now_ns(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_nanos() as u64)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn since_program_start_ns(&self) -> u64 {
        self.started.elapsed().as_nanos() as u64
    }
}

/// Linear device-cycle to host-time mapping of one monitor group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Host nanoseconds per device cycle
    pub slope: f64,
    /// Host nanoseconds at device cycle zero
    pub intercept: f64,
    /// Host nanoseconds at program start
    pub program_start: f64,
}

impl LinearFit {
    /// Convert a device cycle count to host milliseconds since program start
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_host_ms(&self, device: DeviceCycles) -> f64 {
        (self.slope * device.0 as f64) / NS_PER_MS + (self.intercept - self.program_start) / NS_PER_MS
    }
}

/// Outcome of feeding one anchor sample to the calibrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingStep {
    /// First anchor stored, waiting for the second
    NeedMore,
    /// Fit computed from two distinct anchors
    Calibrated,
    /// Both anchors share a device cycle; default slope kept
    Degenerate,
}

#[derive(Debug, Clone, Copy, Default)]
struct GroupCalibration {
    fit: Option<LinearFit>,
    /// First anchor as (device cycles, compensated host ns)
    pending_anchor: Option<(f64, f64)>,
}

/// Per-group clock calibration
#[derive(Debug, Clone)]
pub struct ClockCalibrator {
    groups: [GroupCalibration; MonitorGroup::COUNT],
    default_slope: f64,
    delay_compensation_ns: f64,
}

impl ClockCalibrator {
    /// Create an uncalibrated calibrator
    ///
    /// `trace_clock_mhz` seeds the slope used when anchors are degenerate.
    /// `delay_compensation_ns` is added to each anchor's host time.
    #[must_use]
    pub fn new(trace_clock_mhz: f64, delay_compensation_ns: f64) -> Self {
        Self {
            groups: [GroupCalibration::default(); MonitorGroup::COUNT],
            default_slope: 1000.0 / trace_clock_mhz,
            delay_compensation_ns,
        }
    }

    #[must_use]
    pub fn is_calibrated(&self, group: MonitorGroup) -> bool {
        self.groups[group.index()].fit.is_some()
    }

    #[must_use]
    pub fn fit(&self, group: MonitorGroup) -> Option<LinearFit> {
        self.groups[group.index()].fit
    }

    /// Feed one clock-training sample.
    ///
    /// The first call for a group stores the anchor. The second fits the
    /// line and records program start from `clock`.
    #[allow(clippy::cast_precision_loss)]
    pub fn add_anchor(
        &mut self,
        group: MonitorGroup,
        device: DeviceCycles,
        host_ns: u64,
        clock: &dyn HostClock,
    ) -> TrainingStep {
        let anchor = (device.0 as f64, host_ns as f64 + self.delay_compensation_ns);

        let Some((x1, y1)) = self.groups[group.index()].pending_anchor.take() else {
            self.groups[group.index()].pending_anchor = Some(anchor);
            return TrainingStep::NeedMore;
        };
        let (x2, y2) = anchor;

        let (slope, step) = if x2 == x1 {
            (self.default_slope, TrainingStep::Degenerate)
        } else {
            ((y2 - y1) / (x2 - x1), TrainingStep::Calibrated)
        };

        let program_start = clock.now_ns().saturating_sub(clock.since_program_start_ns()) as f64;

        self.groups[group.index()].fit =
            Some(LinearFit { slope, intercept: y2 - slope * x2, program_start });
        step
    }

    /// Convert device cycles to host milliseconds since program start.
    ///
    /// Returns `None` until the group has been calibrated.
    #[must_use]
    pub fn convert(&self, group: MonitorGroup, device: DeviceCycles) -> Option<f64> {
        self.fit(group).map(|fit| fit.to_host_ms(device))
    }

    /// Drop half-collected anchors. Completed fits are kept.
    pub fn clear_training(&mut self) {
        for group in &mut self.groups {
            group.pending_anchor = None;
        }
    }

    /// Forget every fit and anchor
    pub fn reset(&mut self) {
        self.groups = [GroupCalibration::default(); MonitorGroup::COUNT];
    }
}

/// Time-zero anchor for host timestamps carried on every sample
#[derive(Debug, Clone, Copy, Default)]
pub struct HostBaseline {
    origin_ns: Option<u64>,
}

impl HostBaseline {
    /// Re-evaluate the baseline against the smallest host timestamp of a batch
    pub fn rebase(&mut self, batch_min_ns: u64) {
        self.origin_ns = Some(self.origin_ns.map_or(batch_min_ns, |o| o.min(batch_min_ns)));
    }

    /// Host nanoseconds relative to the baseline
    #[must_use]
    pub fn relative_ns(&self, host_ns: u64) -> u64 {
        host_ns.saturating_sub(self.origin_ns.unwrap_or(0))
    }

    /// Convert relative host nanoseconds to milliseconds
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_ms(relative_ns: u64) -> f64 {
        relative_ns as f64 / NS_PER_MS
    }

    /// Milliseconds from the current baseline to an absolute host time
    #[must_use]
    pub fn elapsed_ms(&self, host_ns: u64) -> f64 {
        Self::to_ms(self.relative_ns(host_ns))
    }

    pub fn reset(&mut self) {
        self.origin_ns = None;
    }
}
