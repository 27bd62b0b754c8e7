//! Compiled-unit metadata extraction.
//!
//! A compiled unit is borrowed from the runtime for one callback. Its name,
//! file and first line are read fresh every time and never cached, since the
//! runtime may recompile or collect the unit between events.

use crate::types::Result;

/// Attribute holding the function name.
pub const ATTR_NAME: &str = "co_name";
/// Attribute holding the source file path.
pub const ATTR_FILE: &str = "co_filename";
/// Attribute holding the first line number.
pub const ATTR_FIRST_LINE: &str = "co_firstlineno";

/// Read access to a runtime-owned compiled unit.
///
/// Each accessor either yields the attribute in primitive form or an error.
/// A line of `0` or `-1` is a value, not a failure signal.
pub trait CompiledUnit {
    fn code_name(&self) -> Result<String>;
    fn source_file(&self) -> Result<String>;
    fn first_line(&self) -> Result<i64>;
}

impl<U: CompiledUnit + ?Sized> CompiledUnit for &U {
    fn code_name(&self) -> Result<String> {
        (**self).code_name()
    }

    fn source_file(&self) -> Result<String> {
        (**self).source_file()
    }

    fn first_line(&self) -> Result<i64> {
        (**self).first_line()
    }
}

/// Name, file and first line of one compiled unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMetadata {
    pub function_name: String,
    pub source_file: String,
    pub first_line: i64,
}

impl UnitMetadata {
    /// Read all three attributes; any failure fails the whole extraction.
    pub fn extract<U: CompiledUnit + ?Sized>(unit: &U) -> Result<Self> {
        let function_name = unit.code_name()?;
        let source_file = unit.source_file()?;
        let first_line = unit.first_line()?;

        Ok(Self {
            function_name,
            source_file,
            first_line,
        })
    }
}
