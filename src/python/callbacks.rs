//! `sys.monitoring` callbacks and the runtime-object adapters they use.
//!
//! Argument parsing is done by pyo3 from each function's signature; a
//! mismatched call raises `TypeError` like any other builtin.

use pyo3::intern;
use pyo3::prelude::*;

use crate::events::{Dispatcher, Printable};
use crate::metadata::CompiledUnit;
use crate::probes::UsdtEmitter;
use crate::types::Result;

static DISPATCHER: Dispatcher<UsdtEmitter> = Dispatcher::new(UsdtEmitter);

/// Borrowed code object, valid for one callback.
#[derive(Debug, Clone, Copy)]
pub struct PyCodeUnit<'a, 'py>(pub &'a Bound<'py, PyAny>);

impl CompiledUnit for PyCodeUnit<'_, '_> {
    fn code_name(&self) -> Result<String> {
        let py = self.0.py();
        Ok(self.0.getattr(intern!(py, "co_name"))?.extract()?)
    }

    fn source_file(&self) -> Result<String> {
        let py = self.0.py();
        Ok(self.0.getattr(intern!(py, "co_filename"))?.extract()?)
    }

    fn first_line(&self) -> Result<i64> {
        let py = self.0.py();
        Ok(self.0.getattr(intern!(py, "co_firstlineno"))?.extract()?)
    }
}

/// Borrowed payload value (return value, yielded value, callable).
#[derive(Debug, Clone, Copy)]
pub struct PyValue<'a, 'py>(pub &'a Bound<'py, PyAny>);

impl Printable for PyValue<'_, '_> {
    /// `repr(value)` as UTF-8. A raised exception comes back as `Err` and is
    /// no longer pending in the interpreter.
    fn repr(&self) -> Result<String> {
        let repr = self.0.repr()?;
        Ok(repr.to_cow()?.into_owned())
    }
}

/// PY_START: callback(code, instruction_offset)
#[pyfunction]
#[pyo3(name = "_py_start_callback")]
pub fn py_start_callback(code: &Bound<'_, PyAny>, offset: i64) -> PyResult<()> {
    DISPATCHER.py_start(&PyCodeUnit(code), offset)?;
    Ok(())
}

/// PY_RESUME: callback(code, instruction_offset)
#[pyfunction]
#[pyo3(name = "_py_resume_callback")]
pub fn py_resume_callback(code: &Bound<'_, PyAny>, offset: i64) -> PyResult<()> {
    DISPATCHER.py_resume(&PyCodeUnit(code), offset)?;
    Ok(())
}

/// PY_RETURN: callback(code, instruction_offset, retval)
#[pyfunction]
#[pyo3(name = "_py_return_callback")]
pub fn py_return_callback(
    code: &Bound<'_, PyAny>,
    offset: i64,
    retval: &Bound<'_, PyAny>,
) -> PyResult<()> {
    DISPATCHER.py_return(&PyCodeUnit(code), offset, &PyValue(retval))?;
    Ok(())
}

/// PY_YIELD: callback(code, instruction_offset, retval)
#[pyfunction]
#[pyo3(name = "_py_yield_callback")]
pub fn py_yield_callback(
    code: &Bound<'_, PyAny>,
    offset: i64,
    retval: &Bound<'_, PyAny>,
) -> PyResult<()> {
    DISPATCHER.py_yield(&PyCodeUnit(code), offset, &PyValue(retval))?;
    Ok(())
}

/// CALL: callback(code, instruction_offset, callable, arg0)
#[pyfunction]
#[pyo3(name = "_call_callback")]
pub fn call_callback(
    code: &Bound<'_, PyAny>,
    offset: i64,
    callable: &Bound<'_, PyAny>,
    arg0: &Bound<'_, PyAny>,
) -> PyResult<()> {
    DISPATCHER.call(&PyCodeUnit(code), offset, &PyValue(callable), &PyValue(arg0))?;
    Ok(())
}

/// LINE: callback(code, line_number)
#[pyfunction]
#[pyo3(name = "_line_callback")]
pub fn line_callback(code: &Bound<'_, PyAny>, line_number: i64) -> PyResult<()> {
    DISPATCHER.line(&PyCodeUnit(code), line_number)?;
    Ok(())
}

#[cfg(all(test, feature = "python"))]
mod tests {
    use super::*;
    use crate::metadata::UnitMetadata;
    use crate::types::Error;
    use pyo3::exceptions::PyAttributeError;
    use pyo3::types::PyModule;

    const FIXTURES: &str = r#"
import types

class Boom:
    def __repr__(self):
        raise ValueError("repr exploded")

class Surrogate:
    def __repr__(self):
        return "\udc80"

def code(first_line):
    return types.SimpleNamespace(
        co_name="handler", co_filename="/srv/app/views.py", co_firstlineno=first_line
    )

headless = types.SimpleNamespace(co_name="handler", co_filename="/srv/app/views.py")
"#;

    fn fixtures<'py>(py: Python<'py>, name: &str) -> Bound<'py, PyModule> {
        PyModule::from_code_bound(py, FIXTURES, &format!("{name}.py"), name).unwrap()
    }

    fn is_attribute_error(py: Python<'_>, err: &Error) -> bool {
        matches!(err, Error::Python(e) if e.is_instance_of::<PyAttributeError>(py))
    }

    #[test]
    fn raising_repr_leaves_no_exception_pending() {
        Python::with_gil(|py| {
            let fx = fixtures(py, "raising_repr_fixtures");
            let code = fx.call_method1("code", (40,)).unwrap();
            let boom = fx.getattr("Boom").unwrap().call0().unwrap();
            let none = py.None().into_bound(py);

            assert!(PyValue(&boom).repr().is_err());
            assert!(!PyErr::occurred(py));

            assert!(py_return_callback(&code, 12, &boom).is_ok());
            assert!(!PyErr::occurred(py));
            assert!(py_yield_callback(&code, 14, &boom).is_ok());
            assert!(!PyErr::occurred(py));
            assert!(call_callback(&code, 8, &boom, &none).is_ok());
            assert!(!PyErr::occurred(py));
        });
    }

    #[test]
    fn undecodable_repr_leaves_no_exception_pending() {
        Python::with_gil(|py| {
            let fx = fixtures(py, "surrogate_repr_fixtures");
            let code = fx.call_method1("code", (40,)).unwrap();
            let surrogate = fx.getattr("Surrogate").unwrap().call0().unwrap();

            assert!(PyValue(&surrogate).repr().is_err());
            assert!(!PyErr::occurred(py));

            assert!(py_return_callback(&code, 12, &surrogate).is_ok());
            assert!(!PyErr::occurred(py));
        });
    }

    #[test]
    fn repr_of_plain_values() {
        Python::with_gil(|py| {
            let text = "bar".to_object(py).into_bound(py);
            assert_eq!(PyValue(&text).repr().unwrap(), "'bar'");
            let none = py.None().into_bound(py);
            assert_eq!(PyValue(&none).repr().unwrap(), "None");
        });
    }

    #[test]
    fn missing_first_line_is_an_error() {
        Python::with_gil(|py| {
            let fx = fixtures(py, "headless_fixtures");
            let headless = fx.getattr("headless").unwrap();

            let err = PyCodeUnit(&headless).first_line().unwrap_err();
            assert!(is_attribute_error(py, &err));
            let err = UnitMetadata::extract(&PyCodeUnit(&headless)).unwrap_err();
            assert!(is_attribute_error(py, &err));

            let err = py_start_callback(&headless, 0).unwrap_err();
            assert!(err.is_instance_of::<PyAttributeError>(py));
            let err = line_callback(&headless, 5).unwrap_err();
            assert!(err.is_instance_of::<PyAttributeError>(py));
        });
    }

    #[test]
    fn zero_and_negative_first_line_are_values() {
        Python::with_gil(|py| {
            let fx = fixtures(py, "first_line_fixtures");
            for first_line in [0_i64, -1] {
                let code = fx.call_method1("code", (first_line,)).unwrap();

                let meta = UnitMetadata::extract(&PyCodeUnit(&code)).unwrap();
                assert_eq!(meta.first_line, first_line);
                assert_eq!(meta.function_name, "handler");
                assert_eq!(meta.source_file, "/srv/app/views.py");

                assert!(py_start_callback(&code, 0).is_ok());
                assert!(py_resume_callback(&code, 2).is_ok());
                assert!(line_callback(&code, 1).is_ok());
            }
        });
    }
}
