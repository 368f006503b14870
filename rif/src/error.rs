use std::fmt;

/// Failures reported by value, collection and pool operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// A fixed-capacity structure would have to grow.
    Capacity,
    /// The allocator hook returned no memory.
    Memory,
    /// An index lies outside the valid range.
    OutOfBounds,
    /// The backend does not provide the operation.
    Unsupported,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Capacity => write!(f, "Capacity exhausted on a fixed-size structure"),
            Error::Memory => write!(f, "Out of memory"),
            Error::OutOfBounds => write!(f, "Index out of bounds"),
            Error::Unsupported => write!(f, "Operation not supported by this backend"),
        }
    }
}

impl std::error::Error for Error {}

/// Result alias used across rif.
pub type Result<T> = std::result::Result<T, Error>;
