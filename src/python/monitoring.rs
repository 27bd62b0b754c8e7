//! [`MonitoringApi`] over the live `sys.monitoring` namespace.

use pyo3::prelude::*;
use pyo3::types::PyModule;

use crate::events::{EventKind, EventMask};
use crate::registration::MonitoringApi;
use crate::types::Result;

#[derive(Debug)]
pub struct PyMonitoring<'py> {
    monitoring: Bound<'py, PyAny>,
    module: Bound<'py, PyModule>,
}

impl<'py> PyMonitoring<'py> {
    /// `module` is the extension module holding the callbacks.
    pub fn new(module: &Bound<'py, PyModule>) -> PyResult<Self> {
        let monitoring = PyModule::import_bound(module.py(), "sys")?.getattr("monitoring")?;
        Ok(Self::from_parts(monitoring, module))
    }

    /// Pair an already-resolved monitoring namespace with the callback module.
    pub(crate) fn from_parts(monitoring: Bound<'py, PyAny>, module: &Bound<'py, PyModule>) -> Self {
        Self {
            monitoring,
            module: module.clone(),
        }
    }
}

impl MonitoringApi for PyMonitoring<'_> {
    fn profiler_id(&self) -> Result<u8> {
        Ok(self.monitoring.getattr("PROFILER_ID")?.extract()?)
    }

    fn use_tool_id(&self, tool_id: u8, name: &str) -> Result<()> {
        self.monitoring.call_method1("use_tool_id", (tool_id, name))?;
        Ok(())
    }

    fn event_flag(&self, kind: EventKind) -> Result<u32> {
        Ok(self
            .monitoring
            .getattr("events")?
            .getattr(kind.event_name())?
            .extract()?)
    }

    fn set_events(&self, tool_id: u8, mask: EventMask) -> Result<()> {
        self.monitoring.call_method1("set_events", (tool_id, mask.bits()))?;
        Ok(())
    }

    fn register_callback(&self, tool_id: u8, kind: EventKind, flag: u32) -> Result<()> {
        let callback = self.module.getattr(kind.callback_name())?;
        self.monitoring.call_method1("register_callback", (tool_id, flag, callback))?;
        Ok(())
    }

    fn unregister_callback(&self, tool_id: u8, _kind: EventKind, flag: u32) -> Result<()> {
        let py = self.monitoring.py();
        self.monitoring.call_method1("register_callback", (tool_id, flag, py.None()))?;
        Ok(())
    }

    fn free_tool_id(&self, tool_id: u8) -> Result<()> {
        self.monitoring.call_method1("free_tool_id", (tool_id,))?;
        Ok(())
    }

    fn announce(&self, line: &str) {
        write_stderr(self.monitoring.py(), line);
    }
}

/// Write one line to `sys.stderr`, honouring any redirection the program
/// has set up.
pub(crate) fn write_stderr(py: Python<'_>, line: &str) {
    let result = PyModule::import_bound(py, "sys")
        .and_then(|sys| sys.getattr("stderr"))
        .and_then(|stderr| stderr.call_method1("write", (format!("{line}\n"),)));
    if let Err(err) = result {
        tracing::warn!(error = %err, "could not write to sys.stderr");
    }
}
