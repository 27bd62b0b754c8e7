//! Monitoring event kinds and the subscription mask.
//!
//! The bridge listens to six `sys.monitoring` events and publishes one probe
//! for each. [`dispatch`] turns a single event into a probe firing.

pub mod dispatch;

pub use dispatch::{Dispatcher, Printable};

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::probes::Probe;

/// A runtime event the bridge subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PyStart,
    PyResume,
    PyReturn,
    PyYield,
    Call,
    Line,
}

impl EventKind {
    /// Every supported kind, in registration order.
    pub const ALL: [EventKind; 6] = [
        EventKind::PyStart,
        EventKind::PyResume,
        EventKind::PyReturn,
        EventKind::PyYield,
        EventKind::Call,
        EventKind::Line,
    ];

    /// Attribute name under `sys.monitoring.events`.
    pub fn event_name(self) -> &'static str {
        match self {
            EventKind::PyStart => "PY_START",
            EventKind::PyResume => "PY_RESUME",
            EventKind::PyReturn => "PY_RETURN",
            EventKind::PyYield => "PY_YIELD",
            EventKind::Call => "CALL",
            EventKind::Line => "LINE",
        }
    }

    /// Name of the module-level callback bound to this kind.
    pub fn callback_name(self) -> &'static str {
        match self {
            EventKind::PyStart => "_py_start_callback",
            EventKind::PyResume => "_py_resume_callback",
            EventKind::PyReturn => "_py_return_callback",
            EventKind::PyYield => "_py_yield_callback",
            EventKind::Call => "_call_callback",
            EventKind::Line => "_line_callback",
        }
    }

    /// CPython's flag value for this event. Registration always asks the
    /// runtime instead; this is for fakes and reporting.
    pub fn default_flag(self) -> u32 {
        match self {
            EventKind::PyStart => 1 << 0,
            EventKind::PyResume => 1 << 1,
            EventKind::PyReturn => 1 << 2,
            EventKind::PyYield => 1 << 3,
            EventKind::Call => 1 << 4,
            EventKind::Line => 1 << 5,
        }
    }

    /// Probe fired for this kind.
    pub fn probe(self) -> Probe {
        match self {
            EventKind::PyStart => Probe::PyStart,
            EventKind::PyResume => Probe::PyResume,
            EventKind::PyReturn => Probe::PyReturn,
            EventKind::PyYield => Probe::PyYield,
            EventKind::Call => Probe::Call,
            EventKind::Line => Probe::Line,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// Bitset of runtime event flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventMask(u32);

impl EventMask {
    pub const EMPTY: EventMask = EventMask(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `flag` is set.
    pub const fn contains(self, flag: u32) -> bool {
        flag != 0 && self.0 & flag == flag
    }

    pub const fn union(self, other: EventMask) -> EventMask {
        EventMask(self.0 | other.0)
    }

    /// Mask with each kind's default flag set.
    pub fn of_kinds<I: IntoIterator<Item = EventKind>>(kinds: I) -> Self {
        kinds
            .into_iter()
            .map(|kind| EventMask(kind.default_flag()))
            .fold(EventMask::EMPTY, EventMask::union)
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        self.union(rhs)
    }
}

impl BitOrAssign<u32> for EventMask {
    fn bitor_assign(&mut self, flag: u32) {
        self.0 |= flag;
    }
}

impl FromIterator<u32> for EventMask {
    fn from_iter<I: IntoIterator<Item = u32>>(flags: I) -> Self {
        let mut mask = EventMask::EMPTY;
        for flag in flags {
            mask |= flag;
        }
        mask
    }
}
