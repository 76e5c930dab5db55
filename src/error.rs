//! Crate-level fatal errors (§7): negative Jacobian, unknown element type,
//! unopened restart file, a missing UnstructuredGrid tag, or a supermesh
//! integration call with mismatched data length. Every one of these
//! terminates the process after a diagnostic line; there is no recovery
//! path once the caller sees this type.

use std::error;
use std::fmt;

#[derive(Debug)]
pub enum FlurryError {
    NonPositiveJacobian { element: usize, detj: f64 },
    UnsupportedElementKind(crate::element::kind::ElementKind),
    RestartFileNotFound(String),
    RestartMissingUnstructuredGrid(String),
    SupermeshDataLengthMismatch { expected: usize, found: usize },
    InvalidConfig(String),
}

impl fmt::Display for FlurryError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        use FlurryError::*;

        match self {
            NonPositiveJacobian { element, detj } => {
                writeln!(fmt, "non-positive Jacobian on element {}: detJ = {}", element, detj)
            }
            UnsupportedElementKind(kind) => writeln!(fmt, "unsupported element kind: {:?}", kind),
            RestartFileNotFound(path) => writeln!(fmt, "could not open restart file: {}", path),
            RestartMissingUnstructuredGrid(path) => {
                writeln!(fmt, "restart file missing UnstructuredGrid tag: {}", path)
            }
            SupermeshDataLengthMismatch { expected, found } => {
                writeln!(fmt, "supermesh integrate called with {} values, expected {}", found, expected)
            }
            InvalidConfig(msg) => writeln!(fmt, "invalid configuration: {}", msg),
        }
    }
}

impl error::Error for FlurryError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn displays_a_readable_message_for_each_kind() {
        let err = FlurryError::NonPositiveJacobian { element: 3, detj: -0.5 };
        assert!(err.to_string().contains("element 3"));
    }
}
