//! # pyusdt - Python monitoring events as USDT tracepoints
//!
//! Subscribes to six `sys.monitoring` events and republishes each one as a
//! static tracepoint under the `pyusdt` provider, so tools such as `bpftrace`
//! can follow a Python program without a debugger or a sampling profiler:
//! - Registration with `sys.monitoring` under the profiler tool id
//! - Code-object metadata extraction (name, file, first line)
//! - Per-event dispatch to fixed-arity SDT probes
//!
//! ## Architecture
//!
//! Control flows one way, synchronously, on the thread that raised the event:
//! ```text
//!   sys.monitoring ──► callbacks ──► Dispatcher ──► UnitMetadata::extract
//!   (python feature)                     │
//!                                        └────────► TracepointEmitter::fire
//!                                                   (pyusdt:PY_START ... LINE)
//! ```
//!
//! The core is runtime-agnostic: the runtime is reached through the
//! [`metadata::CompiledUnit`], [`events::Printable`] and
//! [`registration::MonitoringApi`] traits, with the pyo3 implementations
//! behind the `python` feature.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod events;
pub mod metadata;
pub mod probes;
pub mod registration;
pub mod types;

#[cfg(feature = "python")]
pub mod python;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, Result};
