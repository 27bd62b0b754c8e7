//! Python extension module `libpyusdt`.
//!
//! Importing the module registers the bridge with `sys.monitoring`. Setup
//! errors propagate out of the import, so a half-wired bridge never loads.

// pyo3's macro expansions contain unsafe blocks.
#![allow(unsafe_code)]

mod callbacks;
mod monitoring;

pub use callbacks::{PyCodeUnit, PyValue};
pub use monitoring::PyMonitoring;

use pyo3::prelude::*;

use crate::events::EventKind;
use crate::observability;
use crate::probes::PROVIDER;
use crate::registration;
use crate::types::Config;

/// USDT probe support for Python profiling
#[pymodule]
#[pyo3(name = "libpyusdt")]
fn libpyusdt(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let config = Config::from_env()?;
    observability::init_tracing(&config.observability);

    monitoring::write_stderr(m.py(), "libpyusdt loaded");

    m.add_function(wrap_pyfunction!(callbacks::py_start_callback, m)?)?;
    m.add_function(wrap_pyfunction!(callbacks::py_resume_callback, m)?)?;
    m.add_function(wrap_pyfunction!(callbacks::py_return_callback, m)?)?;
    m.add_function(wrap_pyfunction!(callbacks::py_yield_callback, m)?)?;
    m.add_function(wrap_pyfunction!(callbacks::call_callback, m)?)?;
    m.add_function(wrap_pyfunction!(callbacks::line_callback, m)?)?;
    m.add_function(wrap_pyfunction!(enabled_events, m)?)?;
    m.add("PROVIDER", PROVIDER)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    let monitoring = PyMonitoring::new(m)?;
    let registration = registration::install(&monitoring, &config)?;
    tracing::debug!(tool_id = registration.tool_id(), "libpyusdt ready");
    Ok(())
}

/// Names of the events the bridge is subscribed to.
#[pyfunction]
fn enabled_events() -> Vec<&'static str> {
    registration::current()
        .map(|registration| registration.kinds().map(EventKind::event_name).collect())
        .unwrap_or_default()
}
