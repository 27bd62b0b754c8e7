//! Static tracepoints — the `pyusdt` provider and its six probes.
//!
//! Probe layout (all integers are `i64`, all text is a NUL-terminated
//! `const char *` at the SDT site):
//! ```text
//! PY_START   name, file, line, offset
//! PY_RESUME  name, file, line, offset
//! PY_RETURN  name, file, line, offset, repr(retval)
//! PY_YIELD   name, file, line, offset, repr(value)
//! CALL       name, file, line, offset, repr(callable)
//! LINE       name, file, line_number
//! ```
//!
//! Emission has no error channel. An unattached probe is a `nop` in the
//! binary plus a `.note.stapsdt` entry that `bpftrace -l 'usdt:*'` can list.

use std::ffi::CString;
use std::sync::Mutex;

/// SDT provider name.
pub const PROVIDER: &str = "pyusdt";

/// The fixed set of probes published by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    PyStart,
    PyResume,
    PyReturn,
    PyYield,
    Call,
    Line,
}

impl Probe {
    /// Probe name as seen by tracers (`usdt:...:pyusdt:PY_START`).
    pub fn name(self) -> &'static str {
        match self {
            Probe::PyStart => "PY_START",
            Probe::PyResume => "PY_RESUME",
            Probe::PyReturn => "PY_RETURN",
            Probe::PyYield => "PY_YIELD",
            Probe::Call => "CALL",
            Probe::Line => "LINE",
        }
    }

    /// Number of arguments passed at the probe site.
    pub fn arity(self) -> usize {
        match self {
            Probe::PyStart | Probe::PyResume => 4,
            Probe::PyReturn | Probe::PyYield | Probe::Call => 5,
            Probe::Line => 3,
        }
    }
}

/// Argument tuple for one probe firing. Lives on the caller's stack only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeInvocation<'a> {
    PyStart {
        name: &'a str,
        file: &'a str,
        line: i64,
        offset: i64,
    },
    PyResume {
        name: &'a str,
        file: &'a str,
        line: i64,
        offset: i64,
    },
    PyReturn {
        name: &'a str,
        file: &'a str,
        line: i64,
        offset: i64,
        retval: &'a str,
    },
    PyYield {
        name: &'a str,
        file: &'a str,
        line: i64,
        offset: i64,
        value: &'a str,
    },
    Call {
        name: &'a str,
        file: &'a str,
        line: i64,
        offset: i64,
        callable: &'a str,
    },
    Line {
        name: &'a str,
        file: &'a str,
        line: i64,
    },
}

impl ProbeInvocation<'_> {
    pub fn probe(&self) -> Probe {
        match self {
            ProbeInvocation::PyStart { .. } => Probe::PyStart,
            ProbeInvocation::PyResume { .. } => Probe::PyResume,
            ProbeInvocation::PyReturn { .. } => Probe::PyReturn,
            ProbeInvocation::PyYield { .. } => Probe::PyYield,
            ProbeInvocation::Call { .. } => Probe::Call,
            ProbeInvocation::Line { .. } => Probe::Line,
        }
    }

    /// Convert to an owned record (used by [`RecordingEmitter`]).
    pub fn to_record(&self) -> ProbeRecord {
        let (name, file, line, offset, payload) = match *self {
            ProbeInvocation::PyStart {
                name,
                file,
                line,
                offset,
            }
            | ProbeInvocation::PyResume {
                name,
                file,
                line,
                offset,
            } => (name, file, line, Some(offset), None),
            ProbeInvocation::PyReturn {
                name,
                file,
                line,
                offset,
                retval: payload,
            }
            | ProbeInvocation::PyYield {
                name,
                file,
                line,
                offset,
                value: payload,
            }
            | ProbeInvocation::Call {
                name,
                file,
                line,
                offset,
                callable: payload,
            } => (name, file, line, Some(offset), Some(payload)),
            ProbeInvocation::Line { name, file, line } => (name, file, line, None, None),
        };

        ProbeRecord {
            probe: self.probe(),
            name: name.to_string(),
            file: file.to_string(),
            line,
            offset,
            payload: payload.map(str::to_string),
        }
    }
}

/// Owned copy of one probe firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRecord {
    pub probe: Probe,
    pub name: String,
    pub file: String,
    pub line: i64,
    pub offset: Option<i64>,
    pub payload: Option<String>,
}

impl ProbeRecord {
    /// Number of probe arguments this firing carried.
    pub fn arg_count(&self) -> usize {
        3 + usize::from(self.offset.is_some()) + usize::from(self.payload.is_some())
    }
}

/// Fire-and-forget tracepoint sink.
pub trait TracepointEmitter {
    fn fire(&self, invocation: &ProbeInvocation<'_>);
}

impl<E: TracepointEmitter + ?Sized> TracepointEmitter for &E {
    fn fire(&self, invocation: &ProbeInvocation<'_>) {
        (**self).fire(invocation);
    }
}

/// Emits SystemTap SDT probes under the `pyusdt` provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsdtEmitter;

/// Text handed to a probe site. A tracer reads up to the first NUL, so an
/// interior NUL truncates the string here too.
fn probe_cstring(text: &str) -> CString {
    let bytes = text.as_bytes();
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    CString::new(&bytes[..end]).unwrap_or_default()
}

// Arguments are evaluated only while a tracer has the site enabled, so an
// unattached firing costs a semaphore read and no allocation. The C strings
// are held in the enclosing scope so their pointers stay valid through the
// site.
impl TracepointEmitter for UsdtEmitter {
    #[allow(unsafe_code)]
    fn fire(&self, invocation: &ProbeInvocation<'_>) {
        let (name_c, file_c, payload_c): (CString, CString, CString);
        match *invocation {
            ProbeInvocation::PyStart {
                name,
                file,
                line,
                offset,
            } => {
                probe::probe_lazy!(
                    pyusdt,
                    PY_START,
                    {
                        name_c = probe_cstring(name);
                        name_c.as_ptr()
                    },
                    {
                        file_c = probe_cstring(file);
                        file_c.as_ptr()
                    },
                    line,
                    offset
                );
            }
            ProbeInvocation::PyResume {
                name,
                file,
                line,
                offset,
            } => {
                probe::probe_lazy!(
                    pyusdt,
                    PY_RESUME,
                    {
                        name_c = probe_cstring(name);
                        name_c.as_ptr()
                    },
                    {
                        file_c = probe_cstring(file);
                        file_c.as_ptr()
                    },
                    line,
                    offset
                );
            }
            ProbeInvocation::PyReturn {
                name,
                file,
                line,
                offset,
                retval,
            } => {
                probe::probe_lazy!(
                    pyusdt,
                    PY_RETURN,
                    {
                        name_c = probe_cstring(name);
                        name_c.as_ptr()
                    },
                    {
                        file_c = probe_cstring(file);
                        file_c.as_ptr()
                    },
                    line,
                    offset,
                    {
                        payload_c = probe_cstring(retval);
                        payload_c.as_ptr()
                    }
                );
            }
            ProbeInvocation::PyYield {
                name,
                file,
                line,
                offset,
                value,
            } => {
                probe::probe_lazy!(
                    pyusdt,
                    PY_YIELD,
                    {
                        name_c = probe_cstring(name);
                        name_c.as_ptr()
                    },
                    {
                        file_c = probe_cstring(file);
                        file_c.as_ptr()
                    },
                    line,
                    offset,
                    {
                        payload_c = probe_cstring(value);
                        payload_c.as_ptr()
                    }
                );
            }
            ProbeInvocation::Call {
                name,
                file,
                line,
                offset,
                callable,
            } => {
                probe::probe_lazy!(
                    pyusdt,
                    CALL,
                    {
                        name_c = probe_cstring(name);
                        name_c.as_ptr()
                    },
                    {
                        file_c = probe_cstring(file);
                        file_c.as_ptr()
                    },
                    line,
                    offset,
                    {
                        payload_c = probe_cstring(callable);
                        payload_c.as_ptr()
                    }
                );
            }
            ProbeInvocation::Line { name, file, line } => {
                probe::probe_lazy!(
                    pyusdt,
                    LINE,
                    {
                        name_c = probe_cstring(name);
                        name_c.as_ptr()
                    },
                    {
                        file_c = probe_cstring(file);
                        file_c.as_ptr()
                    },
                    line
                );
            }
        }
    }
}

/// Discards every firing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEmitter;

impl TracepointEmitter for NoopEmitter {
    fn fire(&self, _invocation: &ProbeInvocation<'_>) {}
}

/// Keeps an owned copy of every firing, in order.
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    records: Mutex<Vec<ProbeRecord>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all firings so far.
    pub fn records(&self) -> Vec<ProbeRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.records.lock() {
            Ok(records) => records.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TracepointEmitter for RecordingEmitter {
    fn fire(&self, invocation: &ProbeInvocation<'_>) {
        let record = invocation.to_record();
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}
