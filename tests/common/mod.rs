//! Shared fakes standing in for the Python runtime.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;

use pyusdt::events::{EventKind, EventMask, Printable};
use pyusdt::metadata::CompiledUnit;
use pyusdt::registration::MonitoringApi;
use pyusdt::{Error, Result};

/// Code object with fixed attributes; `None` means the attribute is absent.
#[derive(Debug, Clone)]
pub struct FakeCode {
    pub co_name: Option<String>,
    pub co_filename: Option<String>,
    pub co_firstlineno: Option<i64>,
}

impl FakeCode {
    pub fn new(name: &str, file: &str, first_line: i64) -> Self {
        Self {
            co_name: Some(name.to_string()),
            co_filename: Some(file.to_string()),
            co_firstlineno: Some(first_line),
        }
    }
}

impl CompiledUnit for FakeCode {
    fn code_name(&self) -> Result<String> {
        self.co_name
            .clone()
            .ok_or_else(|| Error::metadata("co_name", "has no attribute"))
    }

    fn source_file(&self) -> Result<String> {
        self.co_filename
            .clone()
            .ok_or_else(|| Error::metadata("co_filename", "has no attribute"))
    }

    fn first_line(&self) -> Result<i64> {
        self.co_firstlineno
            .ok_or_else(|| Error::metadata("co_firstlineno", "has no attribute"))
    }
}

/// Runtime value whose `__repr__` either returns text or raises.
#[derive(Debug, Clone)]
pub enum FakeObject {
    Repr(String),
    RaisingRepr(String),
}

impl FakeObject {
    pub fn repr(text: &str) -> Self {
        FakeObject::Repr(text.to_string())
    }

    pub fn raising(message: &str) -> Self {
        FakeObject::RaisingRepr(message.to_string())
    }
}

impl Printable for FakeObject {
    fn repr(&self) -> Result<String> {
        match self {
            FakeObject::Repr(text) => Ok(text.clone()),
            FakeObject::RaisingRepr(message) => Err(Error::repr(message.clone())),
        }
    }
}

/// In-memory `sys.monitoring` with per-step failure injection.
#[derive(Debug, Default)]
pub struct FakeMonitoring {
    pub fail_profiler_id: bool,
    pub missing_event: Option<EventKind>,
    pub fail_nth_binding: Option<usize>,
    pub fail_unbind: bool,
    pub tools: RefCell<BTreeMap<u8, String>>,
    pub masks: RefCell<BTreeMap<u8, u32>>,
    pub callbacks: RefCell<BTreeMap<(u8, u32), EventKind>>,
    pub binding_attempts: RefCell<usize>,
    pub stderr: RefCell<Vec<String>>,
}

pub const PROFILER_ID: u8 = 2;

impl FakeMonitoring {
    pub fn callable_kinds(&self) -> Vec<EventKind> {
        self.callbacks.borrow().values().copied().collect()
    }

    pub fn mask(&self, tool_id: u8) -> u32 {
        self.masks.borrow().get(&tool_id).copied().unwrap_or(0)
    }
}

impl MonitoringApi for FakeMonitoring {
    fn profiler_id(&self) -> Result<u8> {
        if self.fail_profiler_id {
            return Err(Error::monitoring("PROFILER_ID", "attribute missing"));
        }
        Ok(PROFILER_ID)
    }

    fn use_tool_id(&self, tool_id: u8, name: &str) -> Result<()> {
        let mut tools = self.tools.borrow_mut();
        if let Some(owner) = tools.get(&tool_id) {
            return Err(Error::monitoring(
                "use_tool_id",
                format!("tool {tool_id} is already in use by {owner}"),
            ));
        }
        tools.insert(tool_id, name.to_string());
        Ok(())
    }

    fn event_flag(&self, kind: EventKind) -> Result<u32> {
        if self.missing_event == Some(kind) {
            return Err(Error::monitoring("events", format!("no attribute {kind}")));
        }
        Ok(kind.default_flag())
    }

    fn set_events(&self, tool_id: u8, mask: EventMask) -> Result<()> {
        self.masks.borrow_mut().insert(tool_id, mask.bits());
        Ok(())
    }

    fn register_callback(&self, tool_id: u8, kind: EventKind, flag: u32) -> Result<()> {
        let attempt = {
            let mut attempts = self.binding_attempts.borrow_mut();
            let current = *attempts;
            *attempts += 1;
            current
        };
        if self.fail_nth_binding == Some(attempt) {
            return Err(Error::monitoring("register_callback", format!("{kind} rejected")));
        }
        self.callbacks.borrow_mut().insert((tool_id, flag), kind);
        Ok(())
    }

    fn unregister_callback(&self, tool_id: u8, _kind: EventKind, flag: u32) -> Result<()> {
        if self.fail_unbind {
            return Err(Error::monitoring("register_callback", "cannot unbind"));
        }
        self.callbacks.borrow_mut().remove(&(tool_id, flag));
        Ok(())
    }

    fn free_tool_id(&self, tool_id: u8) -> Result<()> {
        self.tools.borrow_mut().remove(&tool_id);
        self.masks.borrow_mut().remove(&tool_id);
        Ok(())
    }

    fn announce(&self, line: &str) {
        self.stderr.borrow_mut().push(line.to_string());
    }
}
