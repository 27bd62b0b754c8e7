//! Event dispatch — one runtime event → at most one probe firing.
//!
//! Each entry point reads the unit's metadata, renders the payload if the
//! event carries one, and fires the matching probe:
//!   py_start  (unit, offset)                 → PY_START  name, file, line, offset
//!   py_resume (unit, offset)                 → PY_RESUME name, file, line, offset
//!   py_return (unit, offset, retval)         → PY_RETURN name, file, line, offset, repr
//!   py_yield  (unit, offset, value)          → PY_YIELD  name, file, line, offset, repr
//!   call      (unit, offset, callable, arg0) → CALL      name, file, line, offset, repr
//!   line      (unit, line_number)            → LINE      name, file, line_number
//!
//! Metadata failures are returned to the caller. Repr failures are dropped
//! and the probe is skipped for that occurrence.

use crate::metadata::{CompiledUnit, UnitMetadata};
use crate::probes::{ProbeInvocation, TracepointEmitter};
use crate::types::Result;

use super::EventKind;

/// A runtime value that can render its debug form.
pub trait Printable {
    fn repr(&self) -> Result<String>;
}

impl<P: Printable + ?Sized> Printable for &P {
    fn repr(&self) -> Result<String> {
        (**self).repr()
    }
}

/// Stateless translator from runtime events to probe firings.
#[derive(Debug, Default)]
pub struct Dispatcher<E> {
    emitter: E,
}

impl<E: TracepointEmitter> Dispatcher<E> {
    pub const fn new(emitter: E) -> Self {
        Self { emitter }
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn py_start<U: CompiledUnit + ?Sized>(&self, unit: &U, offset: i64) -> Result<()> {
        let meta = UnitMetadata::extract(unit)?;
        self.emitter.fire(&ProbeInvocation::PyStart {
            name: &meta.function_name,
            file: &meta.source_file,
            line: meta.first_line,
            offset,
        });
        Ok(())
    }

    pub fn py_resume<U: CompiledUnit + ?Sized>(&self, unit: &U, offset: i64) -> Result<()> {
        let meta = UnitMetadata::extract(unit)?;
        self.emitter.fire(&ProbeInvocation::PyResume {
            name: &meta.function_name,
            file: &meta.source_file,
            line: meta.first_line,
            offset,
        });
        Ok(())
    }

    pub fn py_return<U, V>(&self, unit: &U, offset: i64, retval: &V) -> Result<()>
    where
        U: CompiledUnit + ?Sized,
        V: Printable + ?Sized,
    {
        let meta = UnitMetadata::extract(unit)?;
        let Some(retval) = render(EventKind::PyReturn, retval) else {
            return Ok(());
        };
        self.emitter.fire(&ProbeInvocation::PyReturn {
            name: &meta.function_name,
            file: &meta.source_file,
            line: meta.first_line,
            offset,
            retval: &retval,
        });
        Ok(())
    }

    pub fn py_yield<U, V>(&self, unit: &U, offset: i64, value: &V) -> Result<()>
    where
        U: CompiledUnit + ?Sized,
        V: Printable + ?Sized,
    {
        let meta = UnitMetadata::extract(unit)?;
        let Some(value) = render(EventKind::PyYield, value) else {
            return Ok(());
        };
        self.emitter.fire(&ProbeInvocation::PyYield {
            name: &meta.function_name,
            file: &meta.source_file,
            line: meta.first_line,
            offset,
            value: &value,
        });
        Ok(())
    }

    /// `arg0` is accepted to match the runtime's callback shape; it is not
    /// rendered or published.
    pub fn call<U, V>(&self, unit: &U, offset: i64, callable: &V, _arg0: &V) -> Result<()>
    where
        U: CompiledUnit + ?Sized,
        V: Printable + ?Sized,
    {
        let meta = UnitMetadata::extract(unit)?;
        let Some(callable) = render(EventKind::Call, callable) else {
            return Ok(());
        };
        self.emitter.fire(&ProbeInvocation::Call {
            name: &meta.function_name,
            file: &meta.source_file,
            line: meta.first_line,
            offset,
            callable: &callable,
        });
        Ok(())
    }

    /// Fires with the executed line, not the unit's first line.
    pub fn line<U: CompiledUnit + ?Sized>(&self, unit: &U, line_number: i64) -> Result<()> {
        let meta = UnitMetadata::extract(unit)?;
        self.emitter.fire(&ProbeInvocation::Line {
            name: &meta.function_name,
            file: &meta.source_file,
            line: line_number,
        });
        Ok(())
    }
}

fn render<V: Printable + ?Sized>(kind: EventKind, value: &V) -> Option<String> {
    match value.repr() {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::trace!(event = %kind, error = %err, "repr failed, probe skipped");
            None
        }
    }
}
