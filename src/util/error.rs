//! Error types for the pathview library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pathview operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Face statement references fewer than three vertices
    #[error("Invalid OBJ file: face at line {line} has {count} vertices, at least 3 required")]
    InvalidFace { line: usize, count: usize },

    /// Face statement references a vertex that was never declared
    #[error("Invalid OBJ file: vertex reference {index} at line {line} is out of range")]
    IndexOutOfRange { line: usize, index: i64 },

    /// Vertex or normal statement with a missing or non-numeric coordinate
    #[error("Invalid OBJ file: malformed vertex at line {line}")]
    InvalidVertex { line: usize },

    /// Face statement with a vertex reference that is not an integer
    #[error("Invalid OBJ file: vertex reference '{token}' at line {line} is not a number")]
    InvalidReference { line: usize, token: String },

    /// Geometry source contains no faces
    #[error("Invalid OBJ file: no faces")]
    EmptyModel,

    /// GPU context lacks a required feature or limit
    #[error("GPU does not meet requirements: {0}")]
    Capability(String),

    /// Render configuration value outside its allowed range
    #[error("Invalid render configuration: {name} = {value} (allowed {min}..={max})")]
    InvalidConfig {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a capability error.
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    /// Errors detected while validating a candidate model before it is committed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidFace { .. }
                | Self::IndexOutOfRange { .. }
                | Self::InvalidVertex { .. }
                | Self::InvalidReference { .. }
                | Self::EmptyModel
        )
    }

    /// Errors that are fatal for a render session.
    pub fn is_capability(&self) -> bool {
        matches!(self, Self::Capability(_))
    }
}

/// Result type alias for pathview operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidFace { line: 7, count: 2 };
        assert!(e.to_string().contains("line 7"));
        assert!(e.to_string().contains("2 vertices"));

        let e = Error::InvalidConfig { name: "bounces", value: 20, min: 1, max: 16 };
        assert!(e.to_string().contains("bounces = 20"));
    }

    #[test]
    fn test_error_classes() {
        assert!(Error::EmptyModel.is_validation());
        assert!(Error::IndexOutOfRange { line: 1, index: -4 }.is_validation());
        assert!(Error::InvalidVertex { line: 2 }.is_validation());
        assert!(Error::InvalidReference { line: 5, token: "1x".into() }.is_validation());
        assert!(!Error::capability("no float targets").is_validation());
        assert!(Error::capability("no float targets").is_capability());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
