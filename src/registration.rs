//! Tool registration with the runtime's monitoring facility.
//!
//! Setup runs once per process, in this order:
//!   1. read the profiler tool id
//!   2. claim it under the configured tool name
//!   3. resolve each event kind's flag and union them
//!   4. install the union as the tool's event mask
//!   5. bind one callback per event kind
//!
//! Any failure after step 2 unwinds what was done (callbacks unbound, mask
//! cleared, tool id freed) before the original error is returned, so a failed
//! setup never leaves the runtime half-wired.

use std::sync::OnceLock;

use crate::events::{EventKind, EventMask};
use crate::types::{Config, Error, Result};

/// The subset of `sys.monitoring` the bridge relies on.
pub trait MonitoringApi {
    /// Tool id reserved for profilers.
    fn profiler_id(&self) -> Result<u8>;

    fn use_tool_id(&self, tool_id: u8, name: &str) -> Result<()>;

    /// Runtime flag for `kind` (`sys.monitoring.events.<NAME>`).
    fn event_flag(&self, kind: EventKind) -> Result<u32>;

    fn set_events(&self, tool_id: u8, mask: EventMask) -> Result<()>;

    /// Bind the bridge's callback for `kind`.
    fn register_callback(&self, tool_id: u8, kind: EventKind, flag: u32) -> Result<()>;

    /// Remove any callback bound for `kind`.
    fn unregister_callback(&self, tool_id: u8, kind: EventKind, flag: u32) -> Result<()>;

    fn free_tool_id(&self, tool_id: u8) -> Result<()>;

    /// Write one diagnostic line to the runtime's stderr.
    fn announce(&self, line: &str);
}

/// Process-lifetime record of a completed registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRegistration {
    tool_id: u8,
    event_mask: EventMask,
    callbacks: Vec<(EventKind, u32)>,
}

impl ToolRegistration {
    pub fn tool_id(&self) -> u8 {
        self.tool_id
    }

    pub fn event_mask(&self) -> EventMask {
        self.event_mask
    }

    /// Bound event kinds with the runtime flag each was bound under.
    pub fn callbacks(&self) -> &[(EventKind, u32)] {
        &self.callbacks
    }

    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.callbacks.iter().map(|(kind, _)| *kind)
    }

    /// Confirmation line naming the active events.
    pub fn summary(&self) -> String {
        let names: Vec<&str> = self.kinds().map(EventKind::event_name).collect();
        format!("pyusdt monitoring enabled ({})", names.join(", "))
    }
}

/// Register the bridge for every supported event kind.
pub fn register<M: MonitoringApi + ?Sized>(api: &M, config: &Config) -> Result<ToolRegistration> {
    let tool_id = api.profiler_id()?;
    api.use_tool_id(tool_id, &config.tool_name)?;
    tracing::debug!(tool_id, tool_name = %config.tool_name, "claimed tool id");

    let mut progress = Progress::default();
    match wire(api, tool_id, &mut progress) {
        Ok(registration) => {
            tracing::info!(
                tool_id,
                mask = registration.event_mask.bits(),
                "monitoring callbacks bound"
            );
            api.announce(&registration.summary());
            Ok(registration)
        }
        Err(err) => {
            tracing::warn!(tool_id, error = %err, "registration failed, rolling back");
            rollback(api, tool_id, &progress);
            Err(err)
        }
    }
}

/// What has been applied to the runtime so far.
#[derive(Debug, Default)]
struct Progress {
    mask_set: bool,
    bound: Vec<(EventKind, u32)>,
}

fn wire<M: MonitoringApi + ?Sized>(
    api: &M,
    tool_id: u8,
    progress: &mut Progress,
) -> Result<ToolRegistration> {
    let flags = EventKind::ALL
        .iter()
        .map(|&kind| api.event_flag(kind).map(|flag| (kind, flag)))
        .collect::<Result<Vec<_>>>()?;

    let event_mask: EventMask = flags.iter().map(|&(_, flag)| flag).collect();
    api.set_events(tool_id, event_mask)?;
    progress.mask_set = true;
    tracing::debug!(tool_id, mask = event_mask.bits(), "event mask installed");

    for &(kind, flag) in &flags {
        api.register_callback(tool_id, kind, flag)?;
        progress.bound.push((kind, flag));
        tracing::debug!(tool_id, event = %kind, "callback bound");
    }

    Ok(ToolRegistration {
        tool_id,
        event_mask,
        callbacks: flags,
    })
}

fn rollback<M: MonitoringApi + ?Sized>(api: &M, tool_id: u8, progress: &Progress) {
    for &(kind, flag) in progress.bound.iter().rev() {
        if let Err(err) = api.unregister_callback(tool_id, kind, flag) {
            tracing::warn!(tool_id, event = %kind, error = %err, "failed to unbind callback");
        }
    }
    if progress.mask_set {
        if let Err(err) = api.set_events(tool_id, EventMask::EMPTY) {
            tracing::warn!(tool_id, error = %err, "failed to clear event mask");
        }
    }
    if let Err(err) = api.free_tool_id(tool_id) {
        tracing::warn!(tool_id, error = %err, "failed to free tool id");
    }
}

static REGISTRATION: OnceLock<ToolRegistration> = OnceLock::new();

/// Register once for the whole process and keep the result.
///
/// A second call fails with [`Error::AlreadyRegistered`] and does not touch
/// the runtime.
pub fn install<M: MonitoringApi + ?Sized>(
    api: &M,
    config: &Config,
) -> Result<&'static ToolRegistration> {
    if let Some(existing) = REGISTRATION.get() {
        return Err(Error::AlreadyRegistered(existing.tool_id));
    }

    let registration = register(api, config)?;
    let tool_id = registration.tool_id;
    REGISTRATION
        .set(registration)
        .map_err(|_| Error::AlreadyRegistered(tool_id))?;
    REGISTRATION
        .get()
        .ok_or(Error::AlreadyRegistered(tool_id))
}

/// The process registration, if [`install`] has succeeded.
pub fn current() -> Option<&'static ToolRegistration> {
    REGISTRATION.get()
}
