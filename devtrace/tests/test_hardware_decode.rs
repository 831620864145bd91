use std::cell::RefCell;

use devtrace::calibration::HostClock;
use devtrace::decoding::{Completeness, Decoder, DecoderConfig, Direction, EventKind};
use devtrace::diagnostics::{DiagnosticSink, Severity};
use devtrace::domain::{ChannelId, DeviceCycles, FlowMode, MonitorGroup, MonitorKind, SlotIndex};
use devtrace::registry::{CapabilityRegistry, DeviceSlots, StaticRegistry};
use devtrace_common::{RawSample, EVENT_TYPE_END, EVENT_TYPE_START, TRACE_FIFO_DEPTH};

const DEVICE: &str = "u200";
const GROUP: MonitorGroup = MonitorGroup::Memory;

#[derive(Default)]
struct RecordingDiagnostics {
    messages: RefCell<Vec<(Severity, String)>>,
}

impl DiagnosticSink for RecordingDiagnostics {
    fn emit(&self, severity: Severity, message: &str) {
        self.messages.borrow_mut().push((severity, message.to_string()));
    }
}

impl RecordingDiagnostics {
    fn warnings(&self) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|(severity, _)| *severity == Severity::Warning)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

/// Program started at host time zero
struct EpochClock;

impl HostClock for EpochClock {
    fn now_ns(&self) -> u64 {
        0
    }

    fn since_program_start_ns(&self) -> u64 {
        0
    }
}

fn registry() -> StaticRegistry {
    StaticRegistry::new(FlowMode::Hardware).with_device(
        DEVICE,
        DeviceSlots {
            memory: vec![
                "shell/host".to_string(),
                "vadd_1/m_axi_gmem".to_string(),
                "vadd_1/m_axi_gmem1".to_string(),
                "mmult_1/m_axi_a".to_string(),
            ],
            accelerator: vec!["vadd_1".to_string()],
        },
    )
}

/// Anchors (0 cycles, 1000 ns) and (100 cycles, 2000 ns): 10 ns per cycle
fn training() -> Vec<RawSample> {
    vec![
        RawSample { timestamp: 0, host_timestamp: 1000, ..RawSample::default() },
        RawSample { timestamp: 100, host_timestamp: 2000, ..RawSample::default() },
    ]
}

/// Expected host time of a device cycle given `training()` and `EpochClock`
fn host_ms(cycles: u64) -> f64 {
    (10.0 * cycles as f64 + 2000.0) / 1e6
}

fn mem(trace_id: u32, timestamp: u64, event_type: u8) -> RawSample {
    RawSample { timestamp, trace_id, event_type, ..RawSample::default() }
}

fn accel(trace_id: u32, timestamp: u64) -> RawSample {
    RawSample { timestamp, trace_id, ..RawSample::default() }
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
}

#[test]
fn test_training_samples_produce_no_events() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);

    let events = decoder.decode(&training(), GROUP);

    assert!(events.is_empty());
    assert!(decoder.calibrator().is_calibrated(GROUP));
    assert!(!decoder.calibrator().is_calibrated(MonitorGroup::Accelerator));
    assert_eq!(decoder.stats.training_samples, 2);

    let messages = diagnostics.messages.borrow();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, Severity::Info);
    assert!(messages[0].1.starts_with("Clock training for memory"));
    assert_eq!(decoder.processed_samples(), 2);
}

#[test]
fn test_write_bursts_pair_in_start_order() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);
    decoder.decode(&training(), GROUP);

    let batch = vec![
        mem(2, 110, EVENT_TYPE_START),
        mem(2, 120, EVENT_TYPE_START),
        mem(2, 130, EVENT_TYPE_START),
        mem(2, 115, EVENT_TYPE_END),
        mem(2, 125, EVENT_TYPE_END),
        mem(2, 135, EVENT_TYPE_END),
    ];
    let events = decoder.decode(&batch, GROUP);

    let spans: Vec<(u64, u64)> =
        events.iter().map(|e| (e.start_cycles.0, e.end_cycles.0)).collect();
    assert_eq!(spans, vec![(110, 115), (120, 125), (130, 135)]);
    for event in &events {
        assert_eq!(event.kind, EventKind::Write);
        assert_eq!(event.channel, ChannelId::memory(1));
        assert_eq!(event.burst_length, 6);
        assert_eq!(event.completeness, Completeness::Full);
    }
    assert_close(events[0].start_ms, host_ms(110));
    assert_close(events[0].end_ms, host_ms(115));
    assert_eq!(decoder.pending_starts(ChannelId::memory(1), Direction::Write), 0);
}

#[test]
fn test_end_without_start_is_zero_length_and_silent() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);
    decoder.decode(&training(), GROUP);

    let events = decoder.decode(&[mem(3, 150, EVENT_TYPE_END)], GROUP);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Read);
    assert_eq!(events[0].start_cycles, DeviceCycles(150));
    assert_eq!(events[0].end_cycles, DeviceCycles(150));
    assert_eq!(events[0].burst_length, 1);
    assert!(diagnostics.warnings().is_empty());
}

#[test]
fn test_single_beat_marker_leaves_queue_untouched() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);
    decoder.decode(&training(), GROUP);

    let mut single_beat = mem(4, 140, EVENT_TYPE_END);
    single_beat.reserved = 1;
    let events = decoder.decode(&[mem(4, 110, EVENT_TYPE_START), single_beat], GROUP);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].start_cycles, DeviceCycles(140));
    assert_eq!(events[0].end_cycles, DeviceCycles(140));
    assert_eq!(decoder.pending_starts(ChannelId::memory(2), Direction::Write), 1);
}

#[test]
fn test_kernel_spans_precede_transfers() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);
    decoder.decode(&training(), GROUP);

    let batch = vec![
        accel(64, 100),
        mem(2, 110, EVENT_TYPE_START),
        mem(2, 120, EVENT_TYPE_END),
        accel(64, 200),
    ];
    let events = decoder.decode(&batch, GROUP);

    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Kernel, EventKind::Write]);
    assert_eq!(events[0].channel, ChannelId::accelerator(0));
    assert_eq!(events[0].start_cycles, DeviceCycles(100));
    assert_eq!(events[0].end_cycles, DeviceCycles(200));
    assert_eq!(events[0].burst_length, 0);
    assert_close(events[0].start_ms, host_ms(100));
    assert_close(events[0].end_ms, host_ms(200));
    assert!(diagnostics.warnings().is_empty());
}

#[test]
fn test_stall_toggles_emit_each_category() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);
    decoder.decode(&training(), GROUP);

    let batch = vec![
        accel(64 | 0x3, 100), // CU + intra-kernel stall start
        accel(64 | 0x2, 130), // intra-kernel stall end
        accel(64 | 0xc, 140), // pipe + external memory stall start
        accel(64 | 0xc, 160), // pipe + external memory stall end
        accel(64 | 0x1, 200), // CU end
    ];
    let events = decoder.decode(&batch, GROUP);

    let summary: Vec<(&str, u64, u64)> = events
        .iter()
        .map(|e| (e.kind.label(), e.start_cycles.0, e.end_cycles.0))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Kernel", 100, 200),
            ("Intra-Kernel Dataflow Stall", 100, 130),
            ("Inter-Kernel Pipe Stall", 140, 160),
            ("External Memory Stall", 140, 160),
        ]
    );
}

#[test]
fn test_open_compute_unit_is_approximated_from_its_ports() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);
    decoder.decode(&training(), GROUP);

    let batch = vec![
        accel(64, 100),
        mem(2, 850, EVENT_TYPE_START),
        mem(2, 900, EVENT_TYPE_END),  // vadd_1 port, slot 1
        mem(5, 700, EVENT_TYPE_END),  // vadd_1 port, slot 2
        mem(6, 1200, EVENT_TYPE_END), // mmult_1 port, unrelated
    ];
    let events = decoder.decode(&batch, GROUP);

    assert_eq!(events.len(), 4);
    let kernel = &events[0];
    assert_eq!(kernel.kind, EventKind::Kernel);
    assert_eq!(kernel.completeness, Completeness::Approximated);
    assert_eq!(kernel.start_cycles, DeviceCycles(100));
    assert_eq!(kernel.end_cycles, DeviceCycles(900));
    assert_close(kernel.end_ms, host_ms(900));

    let warnings = diagnostics.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Incomplete CU profile trace"));
    assert_eq!(decoder.stats.approximated, 1);
}

#[test]
fn test_started_bits_do_not_survive_the_batch() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);
    decoder.decode(&training(), GROUP);

    let first = decoder.decode(&[accel(64, 100)], GROUP);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].completeness, Completeness::Approximated);

    // Seen as a fresh start, not as the end of the span opened above
    let second = decoder.decode(&[accel(64, 300)], GROUP);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].start_cycles, DeviceCycles(300));
    assert_eq!(second[0].completeness, Completeness::Approximated);
}

/// Registry that pairs compute units with ports by table instead of by name
struct PortTable;

impl CapabilityRegistry for PortTable {
    fn slot_count(&self, kind: MonitorKind, _device: &str) -> usize {
        match kind {
            MonitorKind::Memory => 4,
            MonitorKind::Accelerator => 1,
        }
    }

    fn flow_mode(&self) -> FlowMode {
        FlowMode::Hardware
    }

    fn slot_display_name(&self, _kind: MonitorKind, _device: &str, _slot: SlotIndex) -> Option<&str> {
        None
    }

    fn associated_memory_slots(&self, _device: &str, accel_slot: SlotIndex) -> Vec<SlotIndex> {
        if accel_slot == SlotIndex(0) {
            vec![SlotIndex(3)]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn test_reconciliation_uses_injected_port_mapping() {
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &PortTable, &diagnostics, &EpochClock);
    decoder.decode(&training(), GROUP);

    let events =
        decoder.decode(&[accel(64, 100), mem(7, 640, EVENT_TYPE_END), mem(2, 990, EVENT_TYPE_END)], GROUP);

    let kernel = &events[0];
    assert_eq!(kernel.completeness, Completeness::Approximated);
    assert_eq!(kernel.end_cycles, DeviceCycles(640));
}

#[test]
fn test_overflow_adds_hardware_wraparound() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let config = DecoderConfig::default();
    let wrap = config.hw_wrap_cycles;
    let mut decoder = Decoder::new(DEVICE, config, &registry, &diagnostics, &EpochClock);
    decoder.decode(&training(), GROUP);

    let mut wrapped_end = mem(2, 5, EVENT_TYPE_END);
    wrapped_end.overflow = 1;
    let events = decoder.decode(&[mem(2, 10, EVENT_TYPE_START), wrapped_end], GROUP);

    assert_eq!(events[0].end_cycles, DeviceCycles(5 + wrap));
    assert_eq!(events[0].burst_length, wrap - 4);
}

#[test]
fn test_reserved_ids_are_skipped_silently() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);
    decoder.decode(&training(), GROUP);

    let events = decoder.decode(
        &[mem(0, 10, EVENT_TYPE_END), mem(62, 20, EVENT_TYPE_END), accel(600, 30)],
        GROUP,
    );

    assert!(events.is_empty());
    assert!(diagnostics.warnings().is_empty());
    assert_eq!(decoder.stats.unclassified, 3);
}

#[test]
fn test_full_trace_fifo_raises_warning() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);

    let mut batch = training();
    batch.resize(TRACE_FIFO_DEPTH, mem(62, 10, EVENT_TYPE_END));
    let events = decoder.decode(&batch, GROUP);

    assert!(events.is_empty());
    let warnings = diagnostics.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Trace FIFO is full"));
}

#[test]
fn test_sample_cap_truncates_then_stops() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let config = DecoderConfig { max_trace_events: 5, ..DecoderConfig::default() };
    let mut decoder = Decoder::new(DEVICE, config, &registry, &diagnostics, &EpochClock);
    decoder.decode(&training(), GROUP);

    let starts: Vec<RawSample> =
        (1..=5).map(|i| mem(2, 100 + i * 10, EVENT_TYPE_START)).collect();
    decoder.decode(&starts, GROUP);

    assert_eq!(decoder.processed_samples(), 5);
    assert!(decoder.is_exhausted());
    assert_eq!(decoder.pending_starts(ChannelId::memory(1), Direction::Write), 3);

    let events = decoder.decode(&[mem(2, 500, EVENT_TYPE_END)], GROUP);
    assert!(events.is_empty());
    assert_eq!(decoder.processed_samples(), 5);
    assert_eq!(decoder.pending_starts(ChannelId::memory(1), Direction::Write), 3);
}

#[test]
fn test_empty_batch_is_a_no_op() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);

    assert!(decoder.decode(&[], GROUP).is_empty());
    assert_eq!(decoder.processed_samples(), 0);
    assert_eq!(decoder.stats.batches, 0);
}

#[test]
fn test_reset_session_starts_over() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);
    decoder.decode(&training(), GROUP);
    decoder.decode(&[mem(2, 110, EVENT_TYPE_START)], GROUP);

    decoder.reset_session();

    assert_eq!(decoder.processed_samples(), 0);
    assert_eq!(decoder.pending_starts(ChannelId::memory(1), Direction::Write), 0);
    assert!(!decoder.calibrator().is_calibrated(GROUP));
}

#[test]
fn test_single_anchor_is_dropped_at_batch_end() {
    let registry = registry();
    let diagnostics = RecordingDiagnostics::default();
    let mut decoder =
        Decoder::new(DEVICE, DecoderConfig::default(), &registry, &diagnostics, &EpochClock);

    decoder.decode(&training()[..1], GROUP);
    assert!(!decoder.calibrator().is_calibrated(GROUP));

    // Both anchors come from this batch; the write start is ordinary trace
    let mut batch = training();
    batch.push(mem(2, 110, EVENT_TYPE_START));
    decoder.decode(&batch, GROUP);
    assert!(decoder.calibrator().is_calibrated(GROUP));
    assert_eq!(decoder.pending_starts(ChannelId::memory(1), Direction::Write), 1);
}
