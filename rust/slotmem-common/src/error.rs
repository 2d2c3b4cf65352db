use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    /// Returns the allocation failure wrapped by this error, if any.
    pub fn as_alloc_error(&self) -> Option<AllocError> {
        match self.kind() {
            ErrorKind::Alloc(e) => Some(*e),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error(transparent)]
    Alloc(#[from] AllocError),
}

/// Failure reported by a raw allocation primitive.
///
/// Kept small and `Copy`: it is produced on the out-of-memory path, where
/// building a boxed error would itself need the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum AllocError {
    /// The underlying allocator could not satisfy the request.
    #[error("failed to allocate {size} bytes (align {align})")]
    OutOfMemory { size: usize, align: usize },

    /// `count * elem_size` does not fit a valid allocation layout.
    #[error("allocation of {count} elements of {elem_size} bytes overflows the address space")]
    CapacityOverflow { count: usize, elem_size: usize },
}

impl AllocError {
    /// Number of bytes that were requested, when known.
    pub fn requested_bytes(&self) -> Option<usize> {
        match *self {
            AllocError::OutOfMemory { size, .. } => Some(size),
            AllocError::CapacityOverflow { count, elem_size } => count.checked_mul(elem_size),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<AllocError> for Error {
    fn from(e: AllocError) -> Self {
        ErrorKind::Alloc(e).into()
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(e: std::convert::Infallible) -> Self {
        match e {}
    }
}
