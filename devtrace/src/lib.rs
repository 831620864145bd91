//! # devtrace - Accelerator Device Trace Decoder
//!
//! devtrace consumes raw samples captured by an accelerator's performance
//! monitors and reconstructs a timeline of logical transactions (memory
//! read/write bursts, compute-unit execution spans, stall intervals)
//! expressed in host time.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Accelerator Device                           │
//! │   memory monitors (per port)   accelerator monitors (per CU)    │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ trace FIFO offload (RawSample batches)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    devtrace (This Crate)                        │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │ Calibration  │──▶│   Decoder    │──▶│ LogicalEvent │         │
//! │  │ (clock fit)  │   │ (channels)   │   │  sequence    │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! │                        ▲        ▲                               │
//! │          ┌─────────────┘        └─────────────┐                 │
//! │  ┌──────────────┐                     ┌──────────────┐          │
//! │  │   Registry   │                     │ Diagnostics  │          │
//! │  │ (slot names) │                     │  (warnings)  │          │
//! │  └──────────────┘                     └──────────────┘          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`decoding`]: per-channel correlation, both flows, reconciliation
//! - [`calibration`]: device-cycle to host-time mapping
//! - [`registry`]: read-only device capability queries
//! - [`diagnostics`]: non-fatal warnings raised while decoding
//! - [`sample_dump`]: binary dump files of raw samples
//! - [`cli`]: command-line argument parsing
//! - [`domain`]: core domain types and errors
//!
//! ## Flows
//!
//! ### Hardware
//! - The first two samples of a stream train the clock (two-point fit)
//! - Memory monitors send explicit start/end events
//! - Accelerator monitors send toggles for the CU and three stall kinds
//! - Compute units still active at batch end get an approximated end
//!
//! ### Hardware Emulation
//! - Every sample carries a host timestamp
//! - Memory monitors send first/last beat flags
//! - Only the compute-unit toggle is reported
//!
//! ## Typical Usage
//!
//! ```bash
//! devtrace trace.bin --registry u200.json --device u200
//! RUST_LOG=devtrace=debug devtrace trace.bin -r u200.json -d u200 --json
//! ```

pub mod calibration;
pub mod cli;
pub mod decoding;
pub mod diagnostics;
pub mod domain;
pub mod registry;
pub mod sample_dump;
